//! Model capabilities.
//!
//! Records opt into cross-cutting behaviour by exposing capabilities
//! through [`Entity`]. Plugins never inspect concrete record types; they
//! ask each record for `as_auditable()` / `as_tenant_scoped()` and rely
//! on the static [`Schema`] when no record instance is available
//! (queries, bulk updates, deletes).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::TenantId;

/// Created-by / updated-by stamping.
pub trait Auditable {
    fn set_created_by(&mut self, actor: &str);
    fn created_by(&self) -> &str;
    fn set_updated_by(&mut self, actor: &str);
    fn updated_by(&self) -> &str;
}

/// Tenant ownership of a record.
pub trait TenantScoped {
    fn set_tenant_id(&mut self, tenant: &TenantId);
    fn tenant_id(&self) -> Option<&TenantId>;
}

/// Object-safe capability lookup for a single record.
///
/// Both accessors default to `None`; a model declares conformance by
/// overriding the one it supports, usually by handing out an embedded
/// field struct.
pub trait Entity: Send + Sync {
    fn as_auditable(&mut self) -> Option<&mut dyn Auditable> {
        None
    }

    fn as_tenant_scoped(&mut self) -> Option<&mut dyn TenantScoped> {
        None
    }
}

/// Column names of the audit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditColumns {
    pub created_by: &'static str,
    pub updated_by: &'static str,
}

/// Static description of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub tenant_column: Option<&'static str>,
    pub audit_columns: Option<AuditColumns>,
}

impl Schema {
    pub const fn new(table: &'static str) -> Self {
        Self {
            table,
            primary_key: "id",
            tenant_column: None,
            audit_columns: None,
        }
    }

    pub const fn with_primary_key(mut self, column: &'static str) -> Self {
        self.primary_key = column;
        self
    }

    pub const fn with_tenant_column(mut self, column: &'static str) -> Self {
        self.tenant_column = Some(column);
        self
    }

    pub const fn with_audit_columns(
        mut self,
        created_by: &'static str,
        updated_by: &'static str,
    ) -> Self {
        self.audit_columns = Some(AuditColumns {
            created_by,
            updated_by,
        });
        self
    }

    pub const fn is_tenant_scoped(&self) -> bool {
        self.tenant_column.is_some()
    }

    /// Columns fixed at insert: the primary key and, when declared, the
    /// created-by audit column.
    pub fn write_once_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.primary_key];
        if let Some(audit) = self.audit_columns {
            columns.push(audit.created_by);
        }
        columns
    }
}

/// A persisted record type.
pub trait Model: Entity + Serialize + DeserializeOwned + Clone + 'static {
    const SCHEMA: Schema;
}

/// The records targeted by one call: a single record or a batch.
///
/// Whatever shape the caller hands in (`R`, `Box<R>`, `Vec<R>`,
/// `Box<[R]>`) ends up here, and plugins only ever see the normalized
/// slice.
#[derive(Debug, Clone, PartialEq)]
pub enum Records<R> {
    One(R),
    Many(Vec<R>),
}

impl<R> Records<R> {
    pub fn as_slice(&self) -> &[R] {
        match self {
            Records::One(r) => std::slice::from_ref(r),
            Records::Many(rs) => rs.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [R] {
        match self {
            Records::One(r) => std::slice::from_mut(r),
            Records::Many(rs) => rs.as_mut_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn into_vec(self) -> Vec<R> {
        match self {
            Records::One(r) => vec![r],
            Records::Many(rs) => rs,
        }
    }

    /// Apply `f` to every record, keeping the shape.
    pub fn try_map<T, E>(self, mut f: impl FnMut(R) -> Result<T, E>) -> Result<Records<T>, E> {
        Ok(match self {
            Records::One(r) => Records::One(f(r)?),
            Records::Many(rs) => Records::Many(rs.into_iter().map(f).collect::<Result<_, _>>()?),
        })
    }
}

impl<R> From<Box<R>> for Records<R> {
    fn from(record: Box<R>) -> Self {
        Records::One(*record)
    }
}

impl<R> From<Vec<R>> for Records<R> {
    fn from(records: Vec<R>) -> Self {
        Records::Many(records)
    }
}

impl<R> From<Box<[R]>> for Records<R> {
    fn from(records: Box<[R]>) -> Self {
        Records::Many(records.into_vec())
    }
}
