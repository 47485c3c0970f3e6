use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;

use crate::callbacks::{Callbacks, Operation, WardenCallback, WardenPlugin};
use crate::hooks::{collect_method_hooks, HookFut};
use crate::model::{Model, Records};
use crate::{
    CallContext, Changes, HookContext, HookResult, Query, ServiceHooks, ServiceMethodKind,
    WardenAfterHook, WardenBeforeHook, WardenConfig, WardenConfigSnapshot, WardenError,
    WardenErrorHook, WardenService, WardenServiceRegistry,
};

struct WardenAppInner {
    registry: RwLock<WardenServiceRegistry>,
    callbacks: RwLock<Callbacks>,
    plugins: RwLock<HashSet<&'static str>>,
    config: RwLock<WardenConfig>,
}

/// WardenApp is the central container (the "session factory").
///
/// Holds:
/// - service registry (any record type) with per-service typed hooks
/// - named statement callbacks, shared by every service
/// - installed plugins
/// - config
///
/// `P` is the params type passed through every call.
pub struct WardenApp<P = ()>
where
    P: Send + Clone + 'static,
{
    inner: Arc<WardenAppInner>,
    _params: std::marker::PhantomData<fn() -> P>,
}

type HooksForMethod<R, P> = (
    Vec<Arc<dyn WardenBeforeHook<R, P>>>,
    Vec<Arc<dyn WardenAfterHook<R, P>>>,
    Vec<Arc<dyn WardenErrorHook<R, P>>>,
);

type ServiceCall<R, P> = Arc<
    dyn for<'a> Fn(Arc<dyn WardenService<R, P>>, &'a mut HookContext<R, P>) -> HookFut<'a>
        + Send
        + Sync,
>;

// A panic while holding one of these locks leaves plain data behind, so a
// poisoned lock is still safe to use.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl<P> Default for WardenApp<P>
where
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for WardenApp<P>
where
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _params: std::marker::PhantomData,
        }
    }
}

impl<P> WardenApp<P>
where
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(WardenAppInner {
                registry: RwLock::new(WardenServiceRegistry::new()),
                callbacks: RwLock::new(Callbacks::new()),
                plugins: RwLock::new(HashSet::new()),
                config: RwLock::new(WardenConfig::new()),
            }),
            _params: std::marker::PhantomData,
        }
    }

    pub fn register_service<R, S>(&self, name: S, service: Arc<dyn WardenService<R, P>>)
    where
        R: Model,
        S: Into<String>,
    {
        let name = name.into();
        tracing::debug!(service = %name, table = R::SCHEMA.table, "registered service");
        write(&self.inner.registry).register(name, service);
    }

    pub fn has_service(&self, name: &str) -> bool {
        read(&self.inner.registry).contains(name)
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        read(&self.inner.registry)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// `app.service::<User>("users")`
    pub fn service<R>(&self, name: &str) -> Result<ServiceHandle<R, P>>
    where
        R: Model,
    {
        let service = read(&self.inner.registry)
            .entry::<R, P>(name)?
            .service
            .clone();

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            service,
        })
    }

    /// Edit the statement callbacks. The closure's return value is passed
    /// through, so registrations can use `?`:
    ///
    /// `app.callbacks(|c| c.register(Operation::Query, "x:y", cb))?`
    pub fn callbacks<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Callbacks) -> T,
    {
        let mut c = write(&self.inner.callbacks);
        f(&mut c)
    }

    /// Install a plugin. Either every callback of the plugin is
    /// registered or none is.
    pub fn plugin<T>(&self, plugin: T) -> Result<()>
    where
        T: WardenPlugin,
    {
        let name = plugin.name();
        let mut plugins = write(&self.inner.plugins);
        if plugins.contains(name) {
            return Err(
                WardenError::conflict(format!("plugin `{name}` is already installed")).into_anyhow(),
            );
        }

        let mut callbacks = write(&self.inner.callbacks);
        let mut staged = callbacks.clone();
        plugin.install(&mut staged)?;
        *callbacks = staged;
        plugins.insert(name);

        tracing::info!(plugin = name, "installed plugin");
        Ok(())
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        read(&self.inner.plugins).contains(name)
    }

    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        write(&self.inner.config).set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let cfg = read(&self.inner.config);
        cfg.get(key).map(|v| v.to_string())
    }

    /// See [`WardenConfig::load_env`].
    pub fn load_env(&self, prefix: &str) -> usize {
        write(&self.inner.config).load_env(prefix)
    }

    pub fn config_snapshot(&self) -> WardenConfigSnapshot {
        read(&self.inner.config).snapshot()
    }

    fn statement_callbacks(&self, operation: Operation) -> Vec<(String, Arc<dyn WardenCallback>)> {
        read(&self.inner.callbacks).for_operation(operation)
    }
}

pub struct ServiceHandle<R, P>
where
    R: Model,
    P: Send + Clone + 'static,
{
    app: WardenApp<P>,
    name: String,
    service: Arc<dyn WardenService<R, P>>,
}

impl<R, P> ServiceHandle<R, P>
where
    R: Model,
    P: Send + Clone + 'static,
{
    /// `app.service::<User>("users")?.hooks(|h| { ... })`
    pub fn hooks<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        {
            let mut registry = write(&self.app.inner.registry);
            let entry = registry.entry_mut::<R, P>(&self.name)?;
            f(&mut entry.hooks);
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &Arc<dyn WardenService<R, P>> {
        &self.service
    }
}

impl<R, P> ServiceHandle<R, P>
where
    R: Model,
    P: Send + Clone + 'static,
{
    fn collect_hooks_for_method(&self, method: &ServiceMethodKind) -> Result<HooksForMethod<R, P>> {
        let registry = read(&self.app.inner.registry);
        let h = &registry.entry::<R, P>(&self.name)?.hooks;

        let before = collect_method_hooks(&h.before_all, &h.before_by_method, method);
        let after = collect_method_hooks(&h.after_all, &h.after_by_method, method);
        let error = collect_method_hooks(&h.error_all, &h.error_by_method, method);

        Ok((before, after, error))
    }

    fn new_context(
        &self,
        context: CallContext,
        method: ServiceMethodKind,
        params: P,
        query: Query,
    ) -> HookContext<R, P> {
        HookContext::new(
            context,
            self.name.clone(),
            method,
            params,
            query,
            self.app.config_snapshot(),
        )
    }

    /// before hooks → statement callbacks → service call → after hooks,
    /// then error hooks if any stage failed.
    async fn run_pipeline(
        &self,
        mut ctx: HookContext<R, P>,
        service_call: ServiceCall<R, P>,
    ) -> Result<HookContext<R, P>> {
        let method = ctx.method.clone();
        if !self.service.capabilities().allows(&method) {
            return Err(WardenError::method_not_allowed(format!(
                "Method `{}` is not allowed on service `{}`",
                method.as_str(),
                self.name
            ))
            .into_anyhow());
        }

        let (before, after, error) = self.collect_hooks_for_method(&method)?;
        let operation = Operation::for_method(&method);
        let callbacks = self.app.statement_callbacks(operation);

        tracing::debug!(
            service = %self.name,
            method = method.as_str(),
            %operation,
            tenant = ?ctx.context.tenant,
            scope_disabled = ctx.context.scope_disabled,
            "running service call"
        );

        let res = run_stages(
            &mut ctx,
            &before,
            &callbacks,
            self.service.clone(),
            &service_call,
            &after,
        )
        .await;

        if let Err(e) = res {
            ctx.error = Some(e);

            for h in &error {
                if let Err(hook_err) = h.run(&mut ctx).await {
                    tracing::warn!(service = %self.name, error = %hook_err, "error hook failed");
                }
            }

            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        Ok(ctx)
    }

    pub async fn find(&self, context: CallContext, query: Query, params: P) -> Result<Vec<R>> {
        let ctx = self.new_context(context, ServiceMethodKind::Find, params, query);

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(|svc, ctx| {
                    Box::pin(async move {
                        let records = svc.find(&ctx.context, &ctx.query, ctx.params.clone()).await?;
                        ctx.result = Some(HookResult::Many(records));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::Many(v)) => Ok(v),
            None => Ok(vec![]),
            Some(_) => Err(unexpected("find")),
        }
    }

    pub async fn get(&self, context: CallContext, id: &str, params: P) -> Result<R> {
        let ctx = self.new_context(context, ServiceMethodKind::Get, params, Query::new());
        let id = id.to_string();

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(move |svc, ctx| {
                    let id = id.clone();
                    Box::pin(async move {
                        let record = svc
                            .get(&ctx.context, &id, &ctx.query, ctx.params.clone())
                            .await?;
                        ctx.result = Some(HookResult::One(record));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::One(v)) => Ok(v),
            None => Err(WardenError::general_error("get() produced no result").into_anyhow()),
            Some(_) => Err(unexpected("get")),
        }
    }

    pub async fn count(&self, context: CallContext, query: Query, params: P) -> Result<usize> {
        let ctx = self.new_context(context, ServiceMethodKind::Count, params, query);

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(|svc, ctx| {
                    Box::pin(async move {
                        let n = svc.count(&ctx.context, &ctx.query, ctx.params.clone()).await?;
                        ctx.result = Some(HookResult::Count(n));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::Count(n)) => Ok(n),
            None => Ok(0),
            Some(_) => Err(unexpected("count")),
        }
    }

    /// Create a single record.
    pub async fn create(&self, context: CallContext, data: R, params: P) -> Result<R> {
        match self.create_records(context, Records::One(data), params).await? {
            Records::One(v) => Ok(v),
            Records::Many(mut v) if v.len() == 1 => Ok(v.remove(0)),
            Records::Many(_) => Err(unexpected("create")),
        }
    }

    /// Create a batch of records in one call.
    pub async fn create_many(&self, context: CallContext, data: Vec<R>, params: P) -> Result<Vec<R>> {
        Ok(self
            .create_records(context, Records::Many(data), params)
            .await?
            .into_vec())
    }

    /// Create from any supported shape (`R`, `Box<R>`, `Vec<R>`, `Box<[R]>`).
    pub async fn create_records(
        &self,
        context: CallContext,
        data: impl Into<Records<R>>,
        params: P,
    ) -> Result<Records<R>> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Create, params, Query::new());
        ctx.data = Some(data.into());

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(|svc, ctx| {
                    Box::pin(async move {
                        let data = ctx.data.take().ok_or_else(|| {
                            WardenError::bad_request("create() requires ctx.data").into_anyhow()
                        })?;

                        let created = svc.create(&ctx.context, data, ctx.params.clone()).await?;
                        ctx.result = Some(match created {
                            Records::One(v) => HookResult::One(v),
                            Records::Many(v) => HookResult::Many(v),
                        });
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::One(v)) => Ok(Records::One(v)),
            Some(HookResult::Many(v)) => Ok(Records::Many(v)),
            _ => Err(WardenError::general_error("create() produced no result").into_anyhow()),
        }
    }

    /// Full replace of the record `id`.
    pub async fn update(&self, context: CallContext, id: &str, data: R, params: P) -> Result<R> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Update, params, Query::new());
        ctx.data = Some(Records::One(data));
        let id = id.to_string();

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(move |svc, ctx| {
                    let id = id.clone();
                    Box::pin(async move {
                        let data = match ctx.data.take() {
                            Some(Records::One(v)) => v,
                            _ => {
                                return Err(WardenError::bad_request(
                                    "update() requires exactly one record",
                                )
                                .into_anyhow())
                            }
                        };

                        let updated = svc
                            .update(&ctx.context, &id, data, &ctx.query, ctx.params.clone())
                            .await?;
                        ctx.result = Some(HookResult::One(updated));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::One(v)) => Ok(v),
            None => Err(WardenError::general_error("update() produced no result").into_anyhow()),
            Some(_) => Err(unexpected("update")),
        }
    }

    /// Column-wise update of `id`, or of every row matching `query`.
    pub async fn patch(
        &self,
        context: CallContext,
        id: Option<&str>,
        changes: Changes,
        query: Query,
        params: P,
    ) -> Result<Vec<R>> {
        let mut ctx = self.new_context(context, ServiceMethodKind::Patch, params, query);
        ctx.changes = Some(changes);
        let id: Option<String> = id.map(|s| s.to_string());

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(move |svc, ctx| {
                    let id = id.clone();
                    Box::pin(async move {
                        let changes = ctx.changes.take().unwrap_or_default();
                        let patched = svc
                            .patch(&ctx.context, id.as_deref(), changes, &ctx.query, ctx.params.clone())
                            .await?;
                        ctx.result = Some(HookResult::Many(patched));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::Many(v)) => Ok(v),
            None => Ok(vec![]),
            Some(_) => Err(unexpected("patch")),
        }
    }

    /// Remove `id`, or every row matching `query`.
    pub async fn remove(
        &self,
        context: CallContext,
        id: Option<&str>,
        query: Query,
        params: P,
    ) -> Result<Vec<R>> {
        let ctx = self.new_context(context, ServiceMethodKind::Remove, params, query);
        let id: Option<String> = id.map(|s| s.to_string());

        let ctx = self
            .run_pipeline(
                ctx,
                Arc::new(move |svc, ctx| {
                    let id = id.clone();
                    Box::pin(async move {
                        let removed = svc
                            .remove(&ctx.context, id.as_deref(), &ctx.query, ctx.params.clone())
                            .await?;
                        ctx.result = Some(HookResult::Many(removed));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::Many(v)) => Ok(v),
            None => Ok(vec![]),
            Some(_) => Err(unexpected("remove")),
        }
    }
}

async fn run_stages<R, P>(
    ctx: &mut HookContext<R, P>,
    before: &[Arc<dyn WardenBeforeHook<R, P>>],
    callbacks: &[(String, Arc<dyn WardenCallback>)],
    service: Arc<dyn WardenService<R, P>>,
    service_call: &ServiceCall<R, P>,
    after: &[Arc<dyn WardenAfterHook<R, P>>],
) -> Result<()>
where
    R: Model,
    P: Send + Clone + 'static,
{
    for h in before {
        h.run(ctx).await?;
    }

    if !callbacks.is_empty() {
        let operation = Operation::for_method(&ctx.method);
        let mut stmt = ctx.statement(operation);
        for (name, cb) in callbacks {
            tracing::trace!(callback = %name, %operation, "running statement callback");
            cb.run(&mut stmt).await?;
        }
    }

    // sets ctx.result
    (service_call)(service, ctx).await?;

    for h in after.iter().rev() {
        h.run(ctx).await?;
    }

    Ok(())
}

fn unexpected(method: &str) -> anyhow::Error {
    WardenError::general_error(format!("{method}() produced an unexpected result shape")).into_anyhow()
}
