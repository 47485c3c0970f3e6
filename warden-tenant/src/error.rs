use thiserror::Error;
use warden_core::errors::WardenError;

/// Errors raised by the tenant callbacks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// The schema declares a tenant column but a record has no way to set it.
    #[error("`{table}` has tenant column `{column}` but its records expose no tenant setter")]
    MissingSetter { table: String, column: String },

    /// Records expose a tenant setter but the schema declares no tenant column.
    #[error("`{table}` records are tenant-scoped but its schema declares no tenant column")]
    MissingColumn { table: String },

    #[error("no tenant in context for tenant-scoped `{table}`")]
    MissingTenant { table: String },
}

impl From<TenantError> for WardenError {
    fn from(err: TenantError) -> Self {
        let message = err.to_string();
        let warden = match err {
            TenantError::MissingSetter { .. } | TenantError::MissingColumn { .. } => {
                WardenError::unprocessable(message)
            }
            TenantError::MissingTenant { .. } => WardenError::forbidden(message),
        };
        warden.with_source(err.into())
    }
}
