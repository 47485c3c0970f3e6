use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warden_audit::Audit;
use warden_core::{
    Auditable, CallContext, Changes, Entity, Model, Operation, Query, Schema, TenantScoped,
    WardenApp,
};
use warden_memory::MemoryService;
use warden_tenant::Tenant;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Invoice {
    #[serde(default)]
    id: Option<String>,
    amount: i64,
    #[serde(flatten)]
    tenant: Tenant,
    #[serde(flatten)]
    audit: Audit,
}

impl Entity for Invoice {
    fn as_auditable(&mut self) -> Option<&mut dyn Auditable> {
        Some(&mut self.audit)
    }

    fn as_tenant_scoped(&mut self) -> Option<&mut dyn TenantScoped> {
        Some(&mut self.tenant)
    }
}

impl Model for Invoice {
    const SCHEMA: Schema = Schema::new("invoices")
        .with_tenant_column("tenant_id")
        .with_audit_columns("created_by", "updated_by");
}

fn app() -> WardenApp {
    let app: WardenApp = WardenApp::new();
    app.register_service::<Invoice, _>("invoices", Arc::new(MemoryService::<Invoice>::new()));
    warden_audit::register(&app).unwrap();
    warden_tenant::register(&app).unwrap();
    app
}

#[tokio::test]
async fn both_plugins_stamp_the_same_record() {
    let app = app();
    let invoices = app.service::<Invoice>("invoices").unwrap();
    let ctx = CallContext::for_tenant("acme").with_actor("alice");

    let created = invoices
        .create(
            ctx,
            Invoice {
                amount: 100,
                ..Invoice::default()
            },
            (),
        )
        .await
        .unwrap();

    assert_eq!(created.tenant, Tenant::new("acme"));
    assert_eq!(created.audit, Audit::new("alice", "alice"));
}

#[tokio::test]
async fn callbacks_run_in_registration_order() {
    let app = app();

    assert_eq!(
        app.callbacks(|c| c.names(Operation::Create)),
        vec![
            "audit:assign_created_by".to_string(),
            "tenant:assign_tenant_id".to_string()
        ]
    );
    assert_eq!(
        app.callbacks(|c| c.names(Operation::Update)),
        vec![
            "audit:assign_updated_by".to_string(),
            "tenant:add_where_condition".to_string()
        ]
    );
}

#[tokio::test]
async fn scoped_patch_stamps_actor_only_inside_the_tenant() {
    let app = app();
    let invoices = app.service::<Invoice>("invoices").unwrap();

    for tenant in ["acme", "globex"] {
        invoices
            .create(
                CallContext::for_tenant(tenant).with_actor("alice"),
                Invoice {
                    amount: 1,
                    ..Invoice::default()
                },
                (),
            )
            .await
            .unwrap();
    }

    let patched = invoices
        .patch(
            CallContext::for_tenant("acme").with_actor("bob"),
            None,
            Changes::new().set("amount", 2),
            Query::new(),
            (),
        )
        .await
        .unwrap();
    assert_eq!(patched.len(), 1);
    assert_eq!(patched[0].audit, Audit::new("alice", "bob"));

    let globex = invoices
        .find(CallContext::for_tenant("globex"), Query::new(), ())
        .await
        .unwrap();
    assert_eq!(globex[0].amount, 1);
    assert_eq!(globex[0].audit, Audit::new("alice", "alice"));
}
