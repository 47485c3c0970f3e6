//! Per-call context for Warden.
//!
//! Every service call carries a `CallContext` describing who is acting,
//! which tenant the call belongs to and whether tenant scoping has been
//! explicitly switched off. Callers derive a context per logical call;
//! the pipeline clones it into the hook context so it is never shared
//! mutably between concurrent calls.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&TenantId> for serde_json::Value {
    fn from(id: &TenantId) -> Self {
        serde_json::Value::String(id.0.clone())
    }
}

impl From<TenantId> for serde_json::Value {
    fn from(id: TenantId) -> Self {
        serde_json::Value::String(id.0)
    }
}

/// Context carried with every Warden call.
///
/// An empty context is a "system" call: no actor is stamped and no
/// tenant predicate is injected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub actor: Option<String>,
    pub tenant: Option<TenantId>,
    pub scope_disabled: bool,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a call scoped to `tenant`.
    pub fn for_tenant(tenant: impl Into<TenantId>) -> Self {
        Self::new().with_tenant(tenant)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Switch tenant filtering off for this call (administrative access).
    pub fn unscoped(mut self) -> Self {
        self.scope_disabled = true;
        self
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    pub fn is_scope_disabled(&self) -> bool {
        self.scope_disabled
    }
}
