//! warden-tenant: tenant scoping for Warden.
//!
//! Two statement callbacks keep every tenant in its own slice of a
//! shared table:
//!
//! - `tenant:assign_tenant_id` stamps the caller's tenant onto new records
//! - `tenant:add_where_condition` adds `tenant_column = <tenant>` to every
//!   query, update and delete on a tenant-scoped model
//!
//! A model is tenant-scoped when its [`Schema`](warden_core::Schema)
//! declares a tenant column. Records expose the setter through
//! [`TenantScoped`](warden_core::TenantScoped), usually by embedding
//! [`Tenant`].
//!
//! Calls without a tenant id run unfiltered unless `tenant.strict` is
//! set; calls made with [`CallContext::unscoped`](warden_core::CallContext::unscoped)
//! always do.

mod error;
mod options;
mod plugin;
mod tenant;

pub use error::TenantError;
pub use options::{TenantOptions, STRICT_KEY};
pub use plugin::{register, TenantScope, ADD_WHERE_CONDITION, ASSIGN_TENANT_ID};
pub use tenant::Tenant;
