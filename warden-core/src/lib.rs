//! warden-core: the service pipeline Warden plugins hook into.
//!
//! Services are registered on a [`WardenApp`] and called through a
//! [`ServiceHandle`]. Every call runs typed per-service hooks and the
//! app-wide named statement callbacks before it reaches storage; the
//! audit and tenant plugins are nothing more than such callbacks.

pub mod adapters;
pub mod app;
pub mod callbacks;
pub mod config;
pub mod context;
pub mod errors;
pub mod hooks;
pub mod model;
pub mod query;
pub mod registry;
pub mod service;

pub use app::{ServiceHandle, WardenApp};
pub use callbacks::{Callbacks, Operation, Statement, WardenCallback, WardenPlugin};
pub use config::{WardenConfig, WardenConfigSnapshot};
pub use context::{CallContext, TenantId};
pub use errors::{ErrorKind, WardenError};
pub use hooks::{
    HookContext, HookResult, ServiceHooks, WardenAfterHook, WardenBeforeHook, WardenErrorHook,
};
pub use model::{AuditColumns, Auditable, Entity, Model, Records, Schema, TenantScoped};
pub use query::{Changes, Condition, Query};
pub use registry::WardenServiceRegistry;
pub use service::{ServiceCapabilities, ServiceMethodKind, WardenService};
