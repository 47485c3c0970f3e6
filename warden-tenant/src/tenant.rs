use serde::{Deserialize, Serialize};
use warden_core::{TenantId, TenantScoped};

/// Tenant column to embed in a model with `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tenant {
    pub tenant_id: Option<TenantId>,
}

impl Tenant {
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: Some(tenant.into()),
        }
    }
}

impl TenantScoped for Tenant {
    fn set_tenant_id(&mut self, tenant: &TenantId) {
        self.tenant_id = Some(tenant.clone());
    }

    fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }
}
