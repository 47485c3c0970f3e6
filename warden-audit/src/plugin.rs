use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use warden_core::{Callbacks, Operation, Statement, WardenApp, WardenCallback, WardenPlugin};

pub const ASSIGN_CREATED_BY: &str = "audit:assign_created_by";
pub const ASSIGN_UPDATED_BY: &str = "audit:assign_updated_by";

/// Stamps the acting user onto auditable records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditStamper;

impl AuditStamper {
    pub fn new() -> Self {
        Self
    }
}

impl WardenPlugin for AuditStamper {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn install(&self, callbacks: &mut Callbacks) -> Result<()> {
        callbacks.register(Operation::Create, ASSIGN_CREATED_BY, Arc::new(AssignCreatedBy))?;
        callbacks.register(Operation::Update, ASSIGN_UPDATED_BY, Arc::new(AssignUpdatedBy))?;
        Ok(())
    }
}

/// Install [`AuditStamper`] on `app`.
pub fn register<P: Send + Clone + 'static>(app: &WardenApp<P>) -> Result<()> {
    app.plugin(AuditStamper::new())
}

struct AssignCreatedBy;

#[async_trait]
impl WardenCallback for AssignCreatedBy {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        let context = stmt.context;
        let Some(actor) = context.actor() else {
            return Ok(());
        };

        let mut stamped = 0usize;
        for record in stmt.records.iter_mut() {
            if let Some(audit) = record.as_auditable() {
                audit.set_created_by(actor);
                audit.set_updated_by(actor);
                stamped += 1;
            }
        }

        tracing::trace!(table = stmt.schema.table, actor, stamped, "stamped created_by");
        Ok(())
    }
}

struct AssignUpdatedBy;

#[async_trait]
impl WardenCallback for AssignUpdatedBy {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        let context = stmt.context;
        let Some(actor) = context.actor() else {
            return Ok(());
        };

        for record in stmt.records.iter_mut() {
            if let Some(audit) = record.as_auditable() {
                audit.set_updated_by(actor);
            }
        }

        // Column-wise updates carry no records.
        if let (Some(changes), Some(columns)) = (stmt.changes.as_deref_mut(), stmt.schema.audit_columns) {
            changes.remove(columns.created_by);
            changes.insert(columns.updated_by, actor);
        }

        tracing::trace!(table = stmt.schema.table, actor, "stamped updated_by");
        Ok(())
    }
}
