use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::errors::{ErrorKind, WardenError};
use warden_core::{
    CallContext, Condition, Entity, HookContext, HookResult, Model, Operation, Query, Records,
    Schema, ServiceCapabilities, ServiceMethodKind, Statement, WardenAfterHook, WardenApp,
    WardenBeforeHook, WardenCallback, WardenConfig, WardenErrorHook, WardenPlugin, WardenService,
};

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Note {
    id: String,
    owner: String,
    text: String,
}

impl Entity for Note {}

impl Model for Note {
    const SCHEMA: Schema = Schema::new("notes");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Tag {
    name: String,
}

impl Entity for Tag {}

impl Model for Tag {
    const SCHEMA: Schema = Schema::new("tags");
}

/// Find and create only; everything else keeps the trait defaults.
struct NotesService {
    rows: Mutex<Vec<Note>>,
    log: Log,
    capabilities: ServiceCapabilities,
}

impl NotesService {
    fn new(log: Log) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            log,
            capabilities: ServiceCapabilities::standard_crud(),
        }
    }
}

#[async_trait]
impl WardenService<Note> for NotesService {
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, _ctx: &CallContext, query: &Query, _params: ()) -> Result<Vec<Note>> {
        push(&self.log, "service:find");
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|n| match serde_json::to_value(n) {
                Ok(serde_json::Value::Object(row)) => query.matches(&row),
                _ => false,
            })
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        _ctx: &CallContext,
        data: Records<Note>,
        _params: (),
    ) -> Result<Records<Note>> {
        push(&self.log, "service:create");
        self.rows.lock().unwrap().extend(data.as_slice().iter().cloned());
        Ok(data)
    }
}

struct Named {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl WardenBeforeHook<Note, ()> for Named {
    async fn run(&self, _ctx: &mut HookContext<Note, ()>) -> Result<()> {
        push(&self.log, self.name);
        Ok(())
    }
}

#[async_trait]
impl WardenAfterHook<Note, ()> for Named {
    async fn run(&self, _ctx: &mut HookContext<Note, ()>) -> Result<()> {
        push(&self.log, self.name);
        Ok(())
    }
}

struct LogCallback {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl WardenCallback for LogCallback {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        push(
            &self.log,
            format!("{}:{}:{}", self.name, stmt.operation, stmt.records.len()),
        );
        Ok(())
    }
}

/// Restricts queries to the caller's own notes.
struct OwnerOnly;

#[async_trait]
impl WardenCallback for OwnerOnly {
    async fn run(&self, stmt: &mut Statement<'_>) -> Result<()> {
        if let Some(actor) = stmt.context.actor() {
            stmt.query.add_condition(Condition::eq("owner", actor));
        }
        Ok(())
    }
}

struct Reject;

#[async_trait]
impl WardenCallback for Reject {
    async fn run(&self, _stmt: &mut Statement<'_>) -> Result<()> {
        Err(WardenError::forbidden("rejected").into_anyhow())
    }
}

struct Swallow;

#[async_trait]
impl WardenErrorHook<Note, ()> for Swallow {
    async fn run(&self, ctx: &mut HookContext<Note, ()>) -> Result<()> {
        ctx.error = None;
        ctx.result = Some(HookResult::Many(vec![]));
        Ok(())
    }
}

fn note(id: &str, owner: &str) -> Note {
    Note {
        id: id.to_string(),
        owner: owner.to_string(),
        text: format!("note {id}"),
    }
}

fn setup() -> (WardenApp, Log) {
    let log: Log = Arc::default();
    let app: WardenApp = WardenApp::new();
    app.register_service::<Note, _>("notes", Arc::new(NotesService::new(log.clone())));
    (app, log)
}

#[tokio::test]
async fn stages_run_in_order() {
    let (app, log) = setup();

    app.callbacks(|c| {
        c.register(
            Operation::Create,
            "test:first",
            Arc::new(LogCallback { name: "cb1", log: log.clone() }),
        )?;
        c.register(
            Operation::Create,
            "test:second",
            Arc::new(LogCallback { name: "cb2", log: log.clone() }),
        )
    })
    .unwrap();

    let notes = app
        .service::<Note>("notes")
        .unwrap()
        .hooks(|h| {
            h.before_create(Arc::new(Named { name: "before_create", log: log.clone() }));
            h.before_all(Arc::new(Named { name: "before_all", log: log.clone() }));
            h.after_all(Arc::new(Named { name: "after_all", log: log.clone() }));
            h.after_create(Arc::new(Named { name: "after_create", log: log.clone() }));
        })
        .unwrap();

    notes
        .create_many(CallContext::new(), vec![note("1", "a"), note("2", "a")], ())
        .await
        .unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "before_all",
            "before_create",
            "cb1:create:2",
            "cb2:create:2",
            "service:create",
            "after_create",
            "after_all",
        ]
    );
}

#[tokio::test]
async fn callbacks_only_run_for_their_operation() {
    let (app, log) = setup();
    app.callbacks(|c| {
        c.register(
            Operation::Query,
            "test:query",
            Arc::new(LogCallback { name: "q", log: log.clone() }),
        )
    })
    .unwrap();
    let notes = app.service::<Note>("notes").unwrap();

    notes.create(CallContext::new(), note("1", "a"), ()).await.unwrap();
    notes.count(CallContext::new(), Query::new(), ()).await.unwrap();

    assert_eq!(entries(&log), vec!["service:create", "q:query:0", "service:find"]);
}

#[tokio::test]
async fn injected_conditions_reach_the_service() {
    let (app, _) = setup();
    app.callbacks(|c| c.register(Operation::Query, "test:owner", Arc::new(OwnerOnly)))
        .unwrap();
    let notes = app.service::<Note>("notes").unwrap();

    notes
        .create_many(
            CallContext::new(),
            vec![note("1", "ann"), note("2", "ben"), note("3", "ann")],
            (),
        )
        .await
        .unwrap();

    let mine = notes
        .find(CallContext::new().with_actor("ann"), Query::new(), ())
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(notes.count(CallContext::new(), Query::new(), ()).await.unwrap(), 3);
}

#[tokio::test]
async fn duplicate_callback_names_conflict_and_can_be_removed() {
    let (app, _) = setup();

    app.callbacks(|c| c.register(Operation::Query, "test:owner", Arc::new(OwnerOnly)))
        .unwrap();
    let err = app
        .callbacks(|c| c.register(Operation::Query, "test:owner", Arc::new(OwnerOnly)))
        .unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::Conflict);

    // Same name on another operation is fine.
    app.callbacks(|c| c.register(Operation::Delete, "test:owner", Arc::new(OwnerOnly)))
        .unwrap();

    assert!(app.callbacks(|c| c.remove(Operation::Query, "test:owner")));
    assert!(!app.callbacks(|c| c.remove(Operation::Query, "test:owner")));
    assert_eq!(app.callbacks(|c| c.names(Operation::Delete)), vec!["test:owner".to_string()]);
}

#[tokio::test]
async fn failing_callback_aborts_before_the_service() {
    let (app, log) = setup();
    app.callbacks(|c| c.register(Operation::Create, "test:reject", Arc::new(Reject)))
        .unwrap();
    let notes = app.service::<Note>("notes").unwrap();

    let err = notes.create(CallContext::new(), note("1", "a"), ()).await.unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::Forbidden);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn error_hooks_can_swallow_failures() {
    let (app, _) = setup();
    app.callbacks(|c| c.register(Operation::Query, "test:reject", Arc::new(Reject)))
        .unwrap();
    let notes = app
        .service::<Note>("notes")
        .unwrap()
        .hooks(|h| {
            h.error_find(Arc::new(Swallow));
        })
        .unwrap();

    assert!(notes.find(CallContext::new(), Query::new(), ()).await.unwrap().is_empty());

    // Only `find` has the hook.
    let err = notes.count(CallContext::new(), Query::new(), ()).await.unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::Forbidden);
}

#[tokio::test]
async fn methods_outside_capabilities_are_not_allowed() {
    let log: Log = Arc::default();
    let app: WardenApp = WardenApp::new();
    let mut service = NotesService::new(log.clone());
    service.capabilities = ServiceCapabilities::from_methods(vec![ServiceMethodKind::Find]);
    app.register_service::<Note, _>("notes", Arc::new(service));
    let notes = app.service::<Note>("notes").unwrap();

    let err = notes.create(CallContext::new(), note("1", "a"), ()).await.unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::MethodNotAllowed);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn unimplemented_methods_report_not_implemented() {
    let (app, _) = setup();
    let notes = app.service::<Note>("notes").unwrap();

    let err = notes.get(CallContext::new(), "1", ()).await.unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::NotImplemented);
}

#[tokio::test]
async fn service_lookup_checks_name_and_type() {
    let (app, _) = setup();

    assert!(app.has_service("notes"));
    assert_eq!(app.service_names(), vec!["notes".to_string()]);

    let err = app.service::<Note>("missing").err().unwrap();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::NotFound);

    let err = app.service::<Tag>("notes").err().unwrap();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::GeneralError);
}

struct Pair;

impl WardenPlugin for Pair {
    fn name(&self) -> &'static str {
        "pair"
    }

    fn install(&self, callbacks: &mut warden_core::Callbacks) -> Result<()> {
        callbacks.register(Operation::Query, "pair:a", Arc::new(OwnerOnly))?;
        callbacks.register(Operation::Query, "pair:b", Arc::new(OwnerOnly))?;
        Ok(())
    }
}

#[tokio::test]
async fn plugin_install_is_all_or_nothing() {
    let (app, _) = setup();
    app.callbacks(|c| c.register(Operation::Query, "pair:b", Arc::new(OwnerOnly)))
        .unwrap();

    let err = app.plugin(Pair).unwrap_err();
    assert_eq!(WardenError::from_anyhow(&err).unwrap().kind, ErrorKind::Conflict);
    assert!(!app.has_plugin("pair"));
    assert_eq!(app.callbacks(|c| c.names(Operation::Query)), vec!["pair:b".to_string()]);

    app.callbacks(|c| c.remove(Operation::Query, "pair:b"));
    app.plugin(Pair).unwrap();
    assert!(app.has_plugin("pair"));
    assert_eq!(app.callbacks(|c| c.names(Operation::Query)).len(), 2);
}

#[tokio::test]
async fn hooks_see_the_config_snapshot() {
    let (app, _) = setup();
    app.set("notes.page_size", "25");

    struct ReadConfig(Log);

    #[async_trait]
    impl WardenBeforeHook<Note, ()> for ReadConfig {
        async fn run(&self, ctx: &mut HookContext<Note, ()>) -> Result<()> {
            let size = ctx.config.get_usize("notes.page_size").unwrap_or_default();
            push(&self.0, format!("page_size={size}"));
            Ok(())
        }
    }

    let log: Log = Arc::default();
    let notes = app
        .service::<Note>("notes")
        .unwrap()
        .hooks(|h| {
            h.before_find(Arc::new(ReadConfig(log.clone())));
        })
        .unwrap();

    notes.find(CallContext::new(), Query::new(), ()).await.unwrap();
    assert_eq!(entries(&log), vec!["page_size=25"]);
}

#[test]
fn env_style_vars_map_to_dotted_keys() {
    let mut config = WardenConfig::new();
    let vars = vec![
        ("WARDEN__TENANT__STRICT".to_string(), "true".to_string()),
        ("WARDEN__LIMIT".to_string(), "10".to_string()),
        ("OTHER__TENANT__STRICT".to_string(), "false".to_string()),
    ];

    assert_eq!(config.load_vars("WARDEN", vars), 2);
    assert_eq!(config.get("tenant.strict"), Some("true"));

    let snapshot = config.snapshot();
    assert_eq!(snapshot.get_bool("tenant.strict"), Some(true));
    assert_eq!(snapshot.get_usize("limit"), Some(10));
    assert!(!config.has("other.tenant.strict"));
}
