use async_trait::async_trait;
use anyhow::Result;

use crate::context::CallContext;
use crate::errors::WardenError;
use crate::model::Records;
use crate::query::{Changes, Query};

/// Standard service methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Count,
    Create,
    Update,
    Patch,
    Remove,
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Count => "count",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Update => "update",
            ServiceMethodKind::Patch => "patch",
            ServiceMethodKind::Remove => "remove",
        }
    }
}

/// Capabilities describe which methods a service accepts.
///
/// The pipeline rejects calls to any other method with `MethodNotAllowed`
/// before a single hook runs.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// Every standard method.
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Count, Create, Update, Patch, Remove],
        }
    }

    /// Reads only.
    pub fn read_only() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Count],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }
}

fn not_implemented(method: &str) -> anyhow::Error {
    WardenError::not_implemented(format!("Method not implemented: {method}")).into_anyhow()
}

/// Storage-facing service trait.
///
/// - `find`   → list rows matching the query
/// - `get`    → fetch one by id, within the query
/// - `count`  → number of rows matching the query
/// - `create` → insert one or many records
/// - `update` → full replace of one record, within the query
/// - `patch`  → column-wise update of one (`Some(id)`) or many rows
/// - `remove` → delete one (`Some(id)`) or many rows
///
/// The query passed in already carries every condition statement
/// callbacks injected; services must honour all of them. Every method
/// defaults to "not implemented" so a service overrides only what it
/// supports.
#[async_trait]
pub trait WardenService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _ctx: &CallContext, _query: &Query, _params: P) -> Result<Vec<R>> {
        Err(not_implemented("find"))
    }

    async fn get(&self, _ctx: &CallContext, _id: &str, _query: &Query, _params: P) -> Result<R> {
        Err(not_implemented("get"))
    }

    /// Defaults to the length of `find`.
    async fn count(&self, ctx: &CallContext, query: &Query, params: P) -> Result<usize> {
        Ok(self.find(ctx, query, params).await?.len())
    }

    async fn create(&self, _ctx: &CallContext, _data: Records<R>, _params: P) -> Result<Records<R>> {
        Err(not_implemented("create"))
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        _id: &str,
        _data: R,
        _query: &Query,
        _params: P,
    ) -> Result<R> {
        Err(not_implemented("update"))
    }

    async fn patch(
        &self,
        _ctx: &CallContext,
        _id: Option<&str>,
        _changes: Changes,
        _query: &Query,
        _params: P,
    ) -> Result<Vec<R>> {
        Err(not_implemented("patch"))
    }

    async fn remove(
        &self,
        _ctx: &CallContext,
        _id: Option<&str>,
        _query: &Query,
        _params: P,
    ) -> Result<Vec<R>> {
        Err(not_implemented("remove"))
    }
}
