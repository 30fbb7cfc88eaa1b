//! Engine behavior end to end, using small in-test concepts.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use concept_sync::adapters::concepts::ApiConcept;
use concept_sync::application::engine::SyncEngine;
use concept_sync::config::{EngineConfig, GatewayConfig};
use concept_sync::domain::foundation::DomainError;
use concept_sync::domain::sync::{fields_of, sync, ActionRef, Fields, Frames, SyncDeclaration, Vars};
use concept_sync::ports::Concept;
use concept_sync::{actions, fields};

/// Records every action it performs and echoes the input back.
struct Log {
    calls: Mutex<Vec<(String, Fields)>>,
}

impl Log {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Fields)> {
        self.calls.lock().unwrap().clone()
    }

    fn actions_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(action, _)| action).collect()
    }
}

#[async_trait]
impl Concept for Log {
    fn name(&self) -> &str {
        "Log"
    }

    fn actions(&self) -> &[&'static str] {
        &["write", "first", "second", "step"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_entries"]
    }

    async fn perform(&self, action: &str, input: Fields) -> Fields {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), input.clone()));
        input
    }

    async fn query(&self, _name: &str, _input: Fields) -> Vec<Fields> {
        self.calls()
            .into_iter()
            .map(|(action, _)| fields_of(json!({ "action": action })))
            .collect()
    }
}

fn log_ref(action: &str) -> ActionRef {
    ActionRef::new("Log", action)
}

#[tokio::test]
async fn then_actions_run_in_declared_order() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![(
            "WriteTwice",
            sync(|vars: &mut Vars| {
                let msg = vars.var("msg");
                SyncDeclaration::when(actions![(log_ref("write"), fields! { "msg" => &msg })]).then(
                    actions![
                        (log_ref("first"), fields! { "msg" => &msg }),
                        (log_ref("second"), fields! { "msg" => &msg }),
                    ],
                )
            }),
        )])
        .unwrap();

    handle.perform("write", fields_of(json!({"msg": "hi"}))).await.unwrap();

    assert_eq!(log.actions_called(), vec!["write", "first", "second"]);
    assert_eq!(log.calls()[2].1["msg"], json!("hi"));
}

#[tokio::test]
async fn syncs_with_same_variable_names_do_not_interfere() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![
            (
                "FromA",
                sync(|vars: &mut Vars| {
                    let x = vars.var("x");
                    SyncDeclaration::when(actions![(log_ref("write"), fields! { "a" => &x })])
                        .then(actions![(log_ref("first"), fields! { "x" => &x })])
                }),
            ),
            (
                "FromB",
                sync(|vars: &mut Vars| {
                    let x = vars.var("x");
                    SyncDeclaration::when(actions![(log_ref("write"), fields! { "b" => &x })])
                        .then(actions![(log_ref("second"), fields! { "x" => &x })])
                }),
            ),
        ])
        .unwrap();

    handle.perform("write", fields_of(json!({"a": 1, "b": 2}))).await.unwrap();

    let calls = log.calls();
    let first = calls.iter().find(|(action, _)| action == "first").unwrap();
    let second = calls.iter().find(|(action, _)| action == "second").unwrap();
    assert_eq!(first.1["x"], json!(1));
    assert_eq!(second.1["x"], json!(2));
}

#[tokio::test]
async fn then_fires_only_when_every_pattern_matches_one_binding() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![(
            "WriteThenFirst",
            sync(|vars: &mut Vars| {
                let key = vars.var("key");
                SyncDeclaration::when(actions![
                    (log_ref("write"), fields! { "key" => &key }),
                    (log_ref("first"), fields! { "key" => &key }),
                ])
                .then(actions![(log_ref("second"), fields! { "key" => &key })])
            }),
        )])
        .unwrap();

    handle.perform("write", fields_of(json!({"key": "k"}))).await.unwrap();
    // different flow, so it never joins with the write above
    handle.perform("first", fields_of(json!({"key": "k"}))).await.unwrap();
    assert!(!log.actions_called().contains(&"second".to_string()));

    // same key, different value inside one cascade: still no match
    engine
        .register(vec![(
            "WriteCausesFirst",
            sync(|vars: &mut Vars| {
                let key = vars.var("key");
                SyncDeclaration::when(actions![(log_ref("write"), fields! { "key" => &key })])
                    .then(actions![(log_ref("first"), fields! { "key" => "other" })])
            }),
        )])
        .unwrap();
    handle.perform("write", fields_of(json!({"key": "k"}))).await.unwrap();
    assert!(!log.actions_called().contains(&"second".to_string()));
}

#[tokio::test]
async fn where_error_only_aborts_its_own_sync() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![
            (
                "Broken",
                sync(|vars: &mut Vars| {
                    let msg = vars.var("msg");
                    SyncDeclaration::when(actions![(log_ref("write"), fields! { "msg" => &msg })])
                        .where_fn(|_frames: Frames| Err(DomainError::validation("msg", "rejected")))
                        .then(actions![(log_ref("first"), fields! { "msg" => &msg })])
                }),
            ),
            (
                "Healthy",
                sync(|vars: &mut Vars| {
                    let msg = vars.var("msg");
                    SyncDeclaration::when(actions![(log_ref("write"), fields! { "msg" => &msg })])
                        .then(actions![(log_ref("second"), fields! { "msg" => &msg })])
                }),
            ),
        ])
        .unwrap();

    handle.perform("write", fields_of(json!({"msg": "hi"}))).await.unwrap();

    assert_eq!(log.actions_called(), vec!["write", "second"]);
}

#[tokio::test]
async fn unbound_then_variable_skips_only_that_action() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![(
            "HalfBound",
            sync(|vars: &mut Vars| {
                let msg = vars.var("msg");
                let never = vars.var("never");
                SyncDeclaration::when(actions![(log_ref("write"), fields! { "msg" => &msg })]).then(
                    actions![
                        (log_ref("first"), fields! { "msg" => &never }),
                        (log_ref("second"), fields! { "msg" => &msg }),
                    ],
                )
            }),
        )])
        .unwrap();

    handle.perform("write", fields_of(json!({"msg": "hi"}))).await.unwrap();

    assert_eq!(log.actions_called(), vec!["write", "second"]);
}

#[tokio::test]
async fn self_retriggering_sync_fires_once_per_binding() {
    let engine = SyncEngine::default();
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![(
            "Echo",
            sync(|vars: &mut Vars| {
                let n = vars.var("n");
                SyncDeclaration::when(actions![(log_ref("step"), fields! { "n" => &n })])
                    .then(actions![(log_ref("step"), fields! { "n" => &n })])
            }),
        )])
        .unwrap();

    handle.perform("step", fields_of(json!({"n": 1}))).await.unwrap();

    assert_eq!(log.actions_called(), vec!["step", "step"]);
}

#[tokio::test]
async fn cascades_stop_at_max_depth() {
    let engine = SyncEngine::new(EngineConfig {
        max_depth: 5,
        ..EngineConfig::default()
    });
    let log = Log::new();
    let handle = engine.instrument(log.clone()).unwrap();
    engine
        .register(vec![(
            "Increment",
            sync(|vars: &mut Vars| {
                let n = vars.var("n");
                let next = vars.var("next");
                let (current, derived) = (n.clone(), next.clone());
                SyncDeclaration::when(actions![(log_ref("step"), fields! { "n" => &n })])
                    .where_fn(move |frames: Frames| {
                        Ok(frames.map(|frame| {
                            let value = frame.get(&current).and_then(Value::as_i64).unwrap_or(0);
                            frame.with(&derived, json!(value + 1))
                        }))
                    })
                    .then(actions![(log_ref("step"), fields! { "n" => &next })])
            }),
        )])
        .unwrap();

    let started = Instant::now();
    handle.perform("step", fields_of(json!({"n": 0}))).await.unwrap();

    // depth 0 (root) through depth 5
    let steps: Vec<Value> = log.calls().into_iter().map(|(_, input)| input["n"].clone()).collect();
    assert_eq!(steps, (0..=5).map(|n| json!(n)).collect::<Vec<_>>());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(engine.active_flows(), 0);
}

#[tokio::test]
async fn concurrent_requests_never_cross_deliver() {
    let engine = SyncEngine::default();
    let api = engine
        .instrument(Arc::new(ApiConcept::new(&GatewayConfig::default())))
        .unwrap();
    let request = api.action("request");
    let respond = api.action("respond");
    engine
        .register(vec![(
            "Echo",
            sync(move |vars: &mut Vars| {
                let n = vars.var("n");
                let req = vars.var("request");
                SyncDeclaration::when(actions![(
                    request,
                    fields! { "path" => "/echo", "n" => &n },
                    fields! { "request" => &req }
                )])
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "body" => &n }
                )])
            }),
        )])
        .unwrap();

    let tasks: Vec<_> = (0..50)
        .map(|n| {
            let api = api.clone();
            tokio::spawn(async move {
                let opened = api
                    .perform_detached("request", fields_of(json!({"method": "POST", "path": "/echo", "n": n})))
                    .await
                    .unwrap();
                let rows = api
                    .query(
                        "_waitForResponse",
                        fields_of(json!({"request": opened["request"], "timeoutMs": 5000})),
                    )
                    .await;
                (n, rows)
            })
        })
        .collect();

    for task in tasks {
        let (n, rows) = task.await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], json!(200));
        assert_eq!(rows[0]["body"], json!(n));
    }
}

#[tokio::test]
async fn wait_without_response_times_out_promptly() {
    let engine = SyncEngine::default();
    let concept = Arc::new(ApiConcept::new(&GatewayConfig::default()));
    let api = engine.instrument(concept.clone()).unwrap();

    let opened = api
        .perform("request", fields_of(json!({"method": "GET", "path": "/nowhere"})))
        .await
        .unwrap();

    let started = Instant::now();
    let rows = api
        .query(
            "_waitForResponse",
            fields_of(json!({"request": opened["request"], "timeoutMs": 100})),
        )
        .await;
    let elapsed = started.elapsed();

    assert!(rows.is_empty());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(1000));
    assert_eq!(concept.pending(), 0);

    let late = api
        .perform("respond", fields_of(json!({"request": opened["request"]})))
        .await
        .unwrap();
    assert!(late.contains_key("error"));
}
