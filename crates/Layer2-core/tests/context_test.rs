//! Context 실행 통합 테스트 - sync 순서, async 비동기 시작, 실패 전파, 의존성 주입
//!
//! `cargo test -p stater-core --test context_test`

use serde_json::json;
use stater_core::{
    Config, ConfigDefinition, Context, ContextStatus, Error, Injectable, Logger, RunMode,
    Service, ServiceDefinition, Stater, Storage,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn step(name: &'static str, delay_ms: u64, log: &Log) -> Injectable {
    let log = Arc::clone(log);
    Injectable::pending(name, &[], move |_| {
        let log = Arc::clone(&log);
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            log.lock().unwrap().push(name.to_string());
            Ok(())
        }
    })
}

fn failing(name: &'static str) -> Injectable {
    Injectable::pending(name, &[], move |_| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Err(Error::service(name, "boom"))
    })
}

fn runtime_with_steps(log: &Log) -> Stater {
    let stater = Stater::new();
    stater
        .add_service("a", ServiceDefinition::callable(step("a", 60, log)))
        .unwrap();
    stater
        .add_service("b", ServiceDefinition::callable(step("b", 0, log)))
        .unwrap();
    stater
        .add_service("c", ServiceDefinition::callable(step("c", 30, log)))
        .unwrap();
    stater
}

#[tokio::test]
async fn test_sync_runs_in_order() {
    let log: Log = Arc::default();
    let stater = runtime_with_steps(&log);
    stater
        .add_service("pipeline", ServiceDefinition::composite(["a", "b", "c"]))
        .unwrap();
    stater.initialize();

    let context = stater.sync("pipeline", ()).unwrap();
    assert_eq!(context.wait().await, ContextStatus::Completed);

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_sync_selector_list_runs_in_order() {
    let log: Log = Arc::default();
    let stater = runtime_with_steps(&log);
    stater.initialize();

    let context = stater.services().sync(vec!["c", "a", "b"], ()).unwrap();
    assert_eq!(context.len(), 3);
    assert_eq!(context.wait().await, ContextStatus::Completed);

    assert_eq!(*log.lock().unwrap(), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_async_does_not_wait() {
    let log: Log = Arc::default();
    let stater = runtime_with_steps(&log);
    stater
        .add_service("all", ServiceDefinition::composite(["a", "b", "c"]))
        .unwrap();
    stater.initialize();

    let context = stater.run_async("all", ()).unwrap();
    assert_eq!(context.status(), ContextStatus::Completed);
    assert!(log.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*log.lock().unwrap(), vec!["b", "c", "a"]);
}

fn counter(name: &'static str, calls: &Arc<AtomicUsize>) -> Injectable {
    let calls = Arc::clone(calls);
    Injectable::new(name, &[], move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[tokio::test]
async fn test_sync_failure_stops_sequence() {
    let log: Log = Arc::default();
    let stater = runtime_with_steps(&log);
    let after_calls = Arc::new(AtomicUsize::new(0));
    stater
        .add_service("broken", ServiceDefinition::callable(failing("broken")))
        .unwrap();
    stater
        .add_service("after", ServiceDefinition::callable(counter("after", &after_calls)))
        .unwrap();
    stater
        .add_service(
            "pipeline",
            ServiceDefinition::composite(["a", "broken", "after", "c"]),
        )
        .unwrap();
    stater.initialize();

    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);

    let context = stater.sync("pipeline", ()).unwrap();
    context.then(move |_| flag.store(true, Ordering::SeqCst));

    assert_eq!(context.wait().await, ContextStatus::Failed);

    // 뒤따르는 단위가 늦게라도 실행되지 않는지 c의 지연보다 오래 기다림
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*log.lock().unwrap(), vec!["a"]);
    assert!(!fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cyclic_composite_starts_in_both_modes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let stater = Stater::new();
    stater
        .add_service("tick", ServiceDefinition::callable(counter("tick", &calls)))
        .unwrap();
    stater
        .add_service("loop", ServiceDefinition::composite(["loop", "tick"]))
        .unwrap();
    stater
        .add_service("ping", ServiceDefinition::composite(["pong", "tick"]))
        .unwrap();
    stater
        .add_service("pong", ServiceDefinition::composite(["ping"]))
        .unwrap();
    stater.initialize();

    let context = stater.sync("loop", ()).unwrap();
    assert_eq!(context.wait().await, ContextStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let context = stater.run_async("loop", ()).unwrap();
    assert_eq!(context.status(), ContextStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    for mode in [RunMode::Sync, RunMode::Async] {
        let context = Context::new(stater.clone());
        context.insert(stater.services().get_entity("ping").unwrap());
        context.run(mode).await.unwrap();
        assert_eq!(context.status(), ContextStatus::Completed);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_run_returns_first_error() {
    let stater = Stater::new();
    stater
        .add_service("broken", ServiceDefinition::callable(failing("broken")))
        .unwrap();
    stater.initialize();

    let context = stater.services().start("broken", (), RunMode::Async).unwrap();
    assert_eq!(context.status(), ContextStatus::Completed);

    let rerun = Context::new(stater.clone());
    rerun.insert(stater.services().get_entity("broken").unwrap());
    let result = rerun.run(RunMode::Sync).await;

    assert!(matches!(result, Err(Error::Service { .. })));
    assert_eq!(rerun.status(), ContextStatus::Failed);
}

#[tokio::test]
async fn test_then_receives_shared_storage() {
    let stater = Stater::new();
    stater
        .add_service(
            "writer",
            ServiceDefinition::callable(Injectable::new("writer", &["storage"], |args| {
                let storage = args.storage(0).ok_or("storage not injected")?;
                let n = storage.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
                storage.set("n", json!(n + 1))
            })),
        )
        .unwrap();
    stater
        .add_service(
            "reader",
            ServiceDefinition::callable(Injectable::new(
                "reader",
                &["storageData", "storage"],
                |args| {
                    let data = args.value(0).ok_or("storageData not injected")?;
                    let storage = args.storage(1).ok_or("storage not injected")?;
                    storage.set("seen", data["n"].clone())
                },
            )),
        )
        .unwrap();
    stater.initialize();

    let context = stater.sync(vec!["writer", "reader"], json!({ "n": 1 })).unwrap();
    assert_eq!(context.wait().await, ContextStatus::Completed);

    let seen: Arc<Mutex<Option<Storage>>> = Arc::default();
    let sink = Arc::clone(&seen);
    context.then(move |storage| *sink.lock().unwrap() = Some(storage));

    let storage = seen.lock().unwrap().take().unwrap();
    assert_eq!(storage.get("n"), Some(json!(2)));
    assert_eq!(storage.get("seen"), Some(json!(2)));
    assert!(storage.ptr_eq(&context.storage()));
}

#[tokio::test]
async fn test_execution_scope_precedence() {
    let stater = Stater::builder()
        .module("storage", json!("module storage"))
        .module("fs", json!({ "kind": "fs" }))
        .build();
    stater
        .add_config("api-config", ConfigDefinition::new(json!({ "port": 8080 })))
        .unwrap();
    stater
        .add_service(
            "db",
            ServiceDefinition::callable(Injectable::new("db", &[], |_| Ok(()))),
        )
        .unwrap();

    let checked: Arc<Mutex<Vec<bool>>> = Arc::default();
    let sink = Arc::clone(&checked);
    stater
        .add_service(
            "api",
            ServiceDefinition::callable(Injectable::new(
                "api",
                &["config", "storage", "logger", "db", "fs", "getConfig", "nothing"],
                move |args| {
                    let config = args.require::<Config>(0)?;
                    let logger = args.get::<Logger>(2).ok_or("logger not injected")?;
                    *sink.lock().unwrap() = vec![
                        config.get("port") == Some(json!(8080)),
                        args.storage(1).is_some(),
                        logger.prefix().starts_with("exec:"),
                        args.get::<Service>(3).is_some(),
                        args.value(4) == Some(json!({ "kind": "fs" })),
                        args.get::<Stater>(5).is_some(),
                        !args.is_resolved(6),
                    ];
                    Ok(())
                },
            )),
        )
        .unwrap();
    stater.initialize();

    let context = stater.sync("api", ()).unwrap();
    assert_eq!(context.wait().await, ContextStatus::Completed);
    assert_eq!(*checked.lock().unwrap(), vec![true; 7]);
}

#[tokio::test]
async fn test_uninitialized_service_in_sync_fails() {
    let stater = Stater::new();
    stater
        .add_service(
            "cold",
            ServiceDefinition::callable(Injectable::new("cold", &[], |_| Ok(()))),
        )
        .unwrap();

    let context = stater.sync("cold", ()).unwrap();
    assert_eq!(context.wait().await, ContextStatus::Failed);
}
