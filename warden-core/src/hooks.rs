use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::callbacks::{Operation, Statement};
use crate::config::WardenConfigSnapshot;
use crate::context::CallContext;
use crate::model::{Entity, Model, Records};
use crate::query::{Changes, Query};
use crate::service::ServiceMethodKind;

pub type HookFut<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// What a service call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResult<R> {
    One(R),
    Many(Vec<R>),
    Count(usize),
}

/// Context passed to typed hooks.
///
/// R = record type
/// P = params type (caller-defined extras)
#[derive(Debug)]
pub struct HookContext<R, P> {
    pub context: CallContext,
    pub service_name: String,
    pub method: ServiceMethodKind,
    pub params: P,
    pub query: Query,
    pub data: Option<Records<R>>,  // input records (create/update)
    pub changes: Option<Changes>,  // input columns (patch)
    pub result: Option<HookResult<R>>,
    pub error: Option<anyhow::Error>,
    pub config: WardenConfigSnapshot,
}

impl<R, P> HookContext<R, P> {
    pub fn new(
        context: CallContext,
        service_name: impl Into<String>,
        method: ServiceMethodKind,
        params: P,
        query: Query,
        config: WardenConfigSnapshot,
    ) -> Self {
        Self {
            context,
            service_name: service_name.into(),
            method,
            params,
            query,
            data: None,
            changes: None,
            result: None,
            error: None,
            config,
        }
    }
}

impl<R: Model, P> HookContext<R, P> {
    /// Type-erased view of this call for statement callbacks.
    pub fn statement(&mut self, operation: Operation) -> Statement<'_> {
        let records: Vec<&mut dyn Entity> = match self.data.as_mut() {
            Some(data) => data
                .as_mut_slice()
                .iter_mut()
                .map(|r| r as &mut dyn Entity)
                .collect(),
            None => Vec::new(),
        };

        Statement {
            context: &self.context,
            operation,
            method: &self.method,
            service: &self.service_name,
            schema: R::SCHEMA,
            records,
            query: &mut self.query,
            changes: self.changes.as_mut(),
        }
    }
}

#[async_trait]
pub trait WardenBeforeHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

#[async_trait]
pub trait WardenAfterHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

/// Runs when the call failed; `ctx.error` holds the error. Taking it
/// (`ctx.error = None`) swallows the failure.
#[async_trait]
pub trait WardenErrorHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

/// Typed hooks of one service.
pub struct ServiceHooks<R, P> {
    pub before_all: Vec<Arc<dyn WardenBeforeHook<R, P>>>,
    pub before_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn WardenBeforeHook<R, P>>>>,
    pub after_all: Vec<Arc<dyn WardenAfterHook<R, P>>>,
    pub after_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn WardenAfterHook<R, P>>>>,
    pub error_all: Vec<Arc<dyn WardenErrorHook<R, P>>>,
    pub error_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn WardenErrorHook<R, P>>>>,
}

impl<R, P> Default for ServiceHooks<R, P> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! method_hooks {
    ($field:ident, $hook:ident: $($name:ident => $method:ident),* $(,)?) => {
        $(
            pub fn $name(&mut self, hook: Arc<dyn $hook<R, P>>) -> &mut Self {
                self.$field
                    .entry(ServiceMethodKind::$method)
                    .or_default()
                    .push(hook);
                self
            }
        )*
    };
}

impl<R, P> ServiceHooks<R, P> {
    pub fn new() -> Self {
        Self {
            before_all: Vec::new(),
            before_by_method: HashMap::new(),
            after_all: Vec::new(),
            after_by_method: HashMap::new(),
            error_all: Vec::new(),
            error_by_method: HashMap::new(),
        }
    }

    pub fn before_all(&mut self, hook: Arc<dyn WardenBeforeHook<R, P>>) -> &mut Self {
        self.before_all.push(hook);
        self
    }

    pub fn after_all(&mut self, hook: Arc<dyn WardenAfterHook<R, P>>) -> &mut Self {
        self.after_all.push(hook);
        self
    }

    pub fn error_all(&mut self, hook: Arc<dyn WardenErrorHook<R, P>>) -> &mut Self {
        self.error_all.push(hook);
        self
    }

    method_hooks!(before_by_method, WardenBeforeHook:
        before_find => Find,
        before_get => Get,
        before_count => Count,
        before_create => Create,
        before_update => Update,
        before_patch => Patch,
        before_remove => Remove,
    );

    method_hooks!(after_by_method, WardenAfterHook:
        after_find => Find,
        after_get => Get,
        after_count => Count,
        after_create => Create,
        after_update => Update,
        after_patch => Patch,
        after_remove => Remove,
    );

    method_hooks!(error_by_method, WardenErrorHook:
        error_find => Find,
        error_get => Get,
        error_count => Count,
        error_create => Create,
        error_update => Update,
        error_patch => Patch,
        error_remove => Remove,
    );
}

/// `*_all` hooks first, then the ones registered for `method`.
pub(crate) fn collect_method_hooks<H: ?Sized>(
    all: &[Arc<H>],
    by_method: &HashMap<ServiceMethodKind, Vec<Arc<H>>>,
    method: &ServiceMethodKind,
) -> Vec<Arc<H>> {
    let mut out: Vec<Arc<H>> = all.to_vec();
    if let Some(v) = by_method.get(method) {
        out.extend(v.iter().cloned());
    }
    out
}
