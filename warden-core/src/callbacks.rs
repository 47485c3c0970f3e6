//! Named statement callbacks.
//!
//! Callbacks are registered once on the app, per operation, and run for
//! every service regardless of its record type. They see the call
//! through a type-erased [`Statement`]: the call context, the model's
//! static schema, the records as `&mut dyn Entity`, and the mutable
//! query and changes. This is where plugins stamp fields and inject
//! conditions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::context::CallContext;
use crate::errors::WardenError;
use crate::model::{Entity, Schema};
use crate::query::{Changes, Query};
use crate::service::ServiceMethodKind;

/// Persistence operation a callback is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Query,
    Delete,
}

impl Operation {
    pub fn for_method(method: &ServiceMethodKind) -> Self {
        match method {
            ServiceMethodKind::Find | ServiceMethodKind::Get | ServiceMethodKind::Count => {
                Operation::Query
            }
            ServiceMethodKind::Create => Operation::Create,
            ServiceMethodKind::Update | ServiceMethodKind::Patch => Operation::Update,
            ServiceMethodKind::Remove => Operation::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Query => "query",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call, as seen by statement callbacks.
pub struct Statement<'a> {
    pub context: &'a CallContext,
    pub operation: Operation,
    pub method: &'a ServiceMethodKind,
    pub service: &'a str,
    pub schema: Schema,
    /// Records handed in by the caller (create, update); empty otherwise.
    pub records: Vec<&'a mut dyn Entity>,
    pub query: &'a mut Query,
    /// Column assignments of a patch.
    pub changes: Option<&'a mut Changes>,
}

#[async_trait]
pub trait WardenCallback: Send + Sync {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()>;
}

#[derive(Clone)]
struct NamedCallback {
    name: String,
    callback: Arc<dyn WardenCallback>,
}

/// Callbacks by operation, in registration order.
#[derive(Clone, Default)]
pub struct Callbacks {
    by_operation: HashMap<Operation, Vec<NamedCallback>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `name`. Names are unique per operation.
    pub fn register(
        &mut self,
        operation: Operation,
        name: impl Into<String>,
        callback: Arc<dyn WardenCallback>,
    ) -> Result<()> {
        let name = name.into();
        let list = self.by_operation.entry(operation).or_default();
        if list.iter().any(|c| c.name == name) {
            return Err(WardenError::conflict(format!(
                "callback `{name}` is already registered for {operation}"
            ))
            .into_anyhow());
        }

        tracing::debug!(%operation, callback = %name, "registered statement callback");
        list.push(NamedCallback { name, callback });
        Ok(())
    }

    /// Returns whether a callback was removed.
    pub fn remove(&mut self, operation: Operation, name: &str) -> bool {
        let Some(list) = self.by_operation.get_mut(&operation) else {
            return false;
        };
        let before = list.len();
        list.retain(|c| c.name != name);
        list.len() != before
    }

    pub fn names(&self, operation: Operation) -> Vec<String> {
        self.by_operation
            .get(&operation)
            .map(|list| list.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn for_operation(&self, operation: Operation) -> Vec<(String, Arc<dyn WardenCallback>)> {
        self.by_operation
            .get(&operation)
            .map(|list| {
                list.iter()
                    .map(|c| (c.name.clone(), Arc::clone(&c.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A bundle of callbacks installed in one step.
pub trait WardenPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn install(&self, callbacks: &mut Callbacks) -> Result<()>;
}
