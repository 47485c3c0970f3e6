//! warden-memory: an in-memory `WardenService` for Warden.
//!
//! Rows are kept as JSON objects in insertion order and every call is
//! filtered by the conditions of its `Query`. The adapter knows nothing
//! about tenants or actors; isolation comes entirely from the
//! conditions statement callbacks inject.

mod service;

pub use service::MemoryService;
