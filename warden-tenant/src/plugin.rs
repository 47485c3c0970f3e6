use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use warden_core::errors::WardenError;
use warden_core::{
    Callbacks, Condition, Operation, Statement, WardenApp, WardenCallback, WardenPlugin,
};

use crate::error::TenantError;
use crate::options::TenantOptions;

pub const ASSIGN_TENANT_ID: &str = "tenant:assign_tenant_id";
pub const ADD_WHERE_CONDITION: &str = "tenant:add_where_condition";

/// Tenant stamping on create and tenant predicates on everything else.
#[derive(Debug, Clone, Default)]
pub struct TenantScope {
    options: TenantOptions,
}

impl TenantScope {
    pub fn new(options: TenantOptions) -> Self {
        Self { options }
    }
}

impl WardenPlugin for TenantScope {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn install(&self, callbacks: &mut Callbacks) -> Result<()> {
        callbacks.register(
            Operation::Create,
            ASSIGN_TENANT_ID,
            Arc::new(AssignTenantId {
                options: self.options,
            }),
        )?;

        let scope: Arc<dyn WardenCallback> = Arc::new(AddWhereCondition {
            options: self.options,
        });
        for operation in [Operation::Update, Operation::Query, Operation::Delete] {
            callbacks.register(operation, ADD_WHERE_CONDITION, Arc::clone(&scope))?;
        }
        Ok(())
    }
}

/// Install [`TenantScope`] on `app`, with options read from the app config.
pub fn register<P: Send + Clone + 'static>(app: &WardenApp<P>) -> Result<()> {
    let options = TenantOptions::from_config(&app.config_snapshot());
    app.plugin(TenantScope::new(options))
}

/// Strict mode turns a missing tenant on a scoped model into an error.
fn missing_tenant(options: &TenantOptions, stmt: &Statement<'_>) -> Result<()> {
    if !options.strict || stmt.context.is_scope_disabled() || !stmt.schema.is_tenant_scoped() {
        return Ok(());
    }

    tracing::warn!(
        service = stmt.service,
        table = stmt.schema.table,
        operation = %stmt.operation,
        "rejected call without tenant"
    );
    Err(WardenError::from(TenantError::MissingTenant {
        table: stmt.schema.table.to_string(),
    })
    .into_anyhow())
}

/// Records and schema must agree on whether the model is tenant-scoped.
fn check_records(stmt: &mut Statement<'_>) -> Result<()> {
    let table = stmt.schema.table;
    let column = stmt.schema.tenant_column;
    for record in stmt.records.iter_mut() {
        let error = match (record.as_tenant_scoped().is_some(), column) {
            (true, None) => TenantError::MissingColumn {
                table: table.to_string(),
            },
            (false, Some(column)) => TenantError::MissingSetter {
                table: table.to_string(),
                column: column.to_string(),
            },
            _ => continue,
        };

        tracing::warn!(table, operation = %stmt.operation, %error, "aborting call");
        return Err(WardenError::from(error).into_anyhow());
    }
    Ok(())
}

struct AssignTenantId {
    options: TenantOptions,
}

#[async_trait]
impl WardenCallback for AssignTenantId {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        check_records(stmt)?;

        let context = stmt.context;
        let Some(tenant) = context.tenant() else {
            return missing_tenant(&self.options, stmt);
        };

        for record in stmt.records.iter_mut() {
            if let Some(scoped) = record.as_tenant_scoped() {
                scoped.set_tenant_id(tenant);
            }
        }

        tracing::debug!(
            table = stmt.schema.table,
            %tenant,
            records = stmt.records.len(),
            "assigned tenant"
        );
        Ok(())
    }
}

struct AddWhereCondition {
    options: TenantOptions,
}

#[async_trait]
impl WardenCallback for AddWhereCondition {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        check_records(stmt)?;

        let context = stmt.context;
        if context.is_scope_disabled() {
            tracing::trace!(table = stmt.schema.table, "tenant scope disabled");
            return Ok(());
        }

        let Some(column) = stmt.schema.tenant_column else {
            return Ok(());
        };
        let Some(tenant) = context.tenant() else {
            return missing_tenant(&self.options, stmt);
        };

        stmt.query.add_condition(Condition::eq(column, tenant));

        // A scoped update can never move a row to another tenant.
        if stmt.operation == Operation::Update {
            for record in stmt.records.iter_mut() {
                if let Some(scoped) = record.as_tenant_scoped() {
                    scoped.set_tenant_id(tenant);
                }
            }
            if let Some(changes) = stmt.changes.as_deref_mut() {
                if changes.remove(column).is_some() {
                    tracing::debug!(table = stmt.schema.table, column, "dropped tenant column from changes");
                }
            }
        }

        tracing::debug!(
            table = stmt.schema.table,
            operation = %stmt.operation,
            %tenant,
            "added tenant condition"
        );
        Ok(())
    }
}
