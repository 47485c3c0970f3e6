//! warden-audit: created-by / updated-by stamping for Warden.
//!
//! ```ignore
//! warden_audit::register(&app)?;
//!
//! let posts = app.service::<Post>("posts")?;
//! let ctx = CallContext::new().with_actor("alice");
//! let post = posts.create(ctx, Post::default(), ()).await?;
//! assert_eq!(post.audit.created_by, "alice");
//! ```
//!
//! Models opt in by exposing an [`Auditable`](warden_core::Auditable)
//! capability, usually the embedded [`Audit`] struct.

mod audit;
mod plugin;

pub use audit::Audit;
pub use plugin::{register, AuditStamper, ASSIGN_CREATED_BY, ASSIGN_UPDATED_BY};
