//! # Context
//!
//! 한 번의 실행을 나타냅니다. 실행 목록, 공유 Storage, 실행 모드,
//! 완료 리스너를 가집니다.
//!
//! ```text
//! created ──start()──▶ running ──┬──▶ completed  (리스너 호출)
//!                                └──▶ failed     (sync 모드의 실패)
//! ```
//!
//! - async: 모든 항목을 기다리지 않고 시작한 뒤 곧바로 completed
//! - sync:  항목을 순서대로 실행하고 모두 끝나면 completed

use crate::resolver::{Args, MapScope, Resolver};
use crate::runtime::{ControlScope, Stater, CONTROL_NAMES};
use crate::service::{detach, BoundService, Injectable, Outcome, Service};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use stater_foundation::{Logger, Result, RunMode, Storage};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info};

type Listener = Box<dyn FnOnce(Storage) + Send>;

// ============================================================================
// ContextStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    #[default]
    Created,
    Running,
    Completed,
    Failed,
}

impl ContextStatus {
    /// 더 이상 바뀌지 않는 상태인지
    pub fn is_settled(&self) -> bool {
        matches!(self, ContextStatus::Completed | ContextStatus::Failed)
    }
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextStatus::Created => write!(f, "created"),
            ContextStatus::Running => write!(f, "running"),
            ContextStatus::Completed => write!(f, "completed"),
            ContextStatus::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Runnable
// ============================================================================

/// Context에 넣을 수 있는 항목
#[derive(Debug, Clone)]
pub enum Runnable {
    Service(Arc<Service>),
    Callable(Injectable),
}

impl From<Arc<Service>> for Runnable {
    fn from(service: Arc<Service>) -> Self {
        Runnable::Service(service)
    }
}

impl From<Injectable> for Runnable {
    fn from(callable: Injectable) -> Self {
        Runnable::Callable(callable)
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Service(BoundService),
    Callable(Injectable),
}

impl Entry {
    fn label(&self) -> String {
        match self {
            Entry::Service(bound) => bound.service().id(),
            Entry::Callable(callable) => callable.name().to_string(),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

pub(crate) struct ContextInner {
    id: i64,
    main: Stater,
    mode: Mutex<RunMode>,
    sharing: MapScope,
    storage: Storage,
    entries: Mutex<Vec<Entry>>,
    status: watch::Sender<ContextStatus>,
    listener: Mutex<Option<Listener>>,
}

/// 실행 컨텍스트 (복제해도 같은 실행을 가리킴)
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// 빈 Storage로 생성
    pub fn new(main: Stater) -> Self {
        Self::with_storage(main, Storage::new())
    }

    /// 주어진 Storage를 공유하는 Context
    pub fn with_storage(main: Stater, storage: Storage) -> Self {
        let (status, _) = watch::channel(ContextStatus::Created);
        let mode = main.config().default_mode;
        let sharing = main.shared_scope();
        let id = chrono::Utc::now().timestamp_millis();

        debug!("[exec:{}] Context created", id);

        Self {
            inner: Arc::new(ContextInner {
                id,
                main,
                mode: Mutex::new(mode),
                sharing,
                storage,
                entries: Mutex::new(Vec::new()),
                status,
                listener: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ContextInner> {
        Arc::downgrade(&self.inner)
    }

    /// 생성 시각(ms)으로 만든 식별자
    pub fn id(&self) -> i64 {
        self.inner.id
    }

    pub fn mode(&self) -> RunMode {
        *self.inner.mode.lock()
    }

    pub fn status(&self) -> ContextStatus {
        *self.inner.status.borrow()
    }

    /// 공유 Storage 핸들
    pub fn storage(&self) -> Storage {
        self.inner.storage.clone()
    }

    pub fn runtime(&self) -> &Stater {
        &self.inner.main
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// 항목 추가 (서비스는 이 Context에 묶임)
    pub fn insert(&self, item: impl Into<Runnable>) -> &Self {
        let entry = match item.into() {
            Runnable::Service(service) => Entry::Service(service.bind(self)),
            Runnable::Callable(callable) => Entry::Callable(callable),
        };
        debug!("[exec:{}] Inserted {}", self.inner.id, entry.label());
        self.inner.entries.lock().push(entry);
        self
    }

    // ========================================================================
    // 실행
    // ========================================================================

    /// 주어진 모드로 실행 시작
    ///
    /// sync 모드는 백그라운드 작업으로 실행되며 끝나면 completed 또는 failed가
    /// 됩니다. 결과를 기다리려면 `wait()` 또는 `run()`을 사용합니다.
    pub fn start(&self, mode: RunMode) -> &Self {
        *self.inner.mode.lock() = mode;
        self.set_status(ContextStatus::Running);

        match mode {
            RunMode::Async => self.drive_async(),
            RunMode::Sync => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let context = self.clone();
                    handle.spawn(async move {
                        let _ = context.drive_sync().await;
                    });
                }
                Err(_) => {
                    error!(
                        "[exec:{}] sync start requires an async runtime",
                        self.inner.id
                    );
                    self.set_status(ContextStatus::Failed);
                }
            },
        }
        self
    }

    pub fn sync(&self) -> &Self {
        self.start(RunMode::Sync)
    }

    pub fn run_async(&self) -> &Self {
        self.start(RunMode::Async)
    }

    /// 실행하고 끝날 때까지 대기
    ///
    /// sync 모드에서는 첫 번째 실패를 그대로 돌려줍니다.
    pub async fn run(&self, mode: RunMode) -> Result<()> {
        *self.inner.mode.lock() = mode;
        self.set_status(ContextStatus::Running);

        match mode {
            RunMode::Async => {
                self.drive_async();
                Ok(())
            }
            RunMode::Sync => self.drive_sync().await,
        }
    }

    fn drive_async(&self) {
        let entries = self.inner.entries.lock().clone();
        info!(
            "[exec:{}] Starting {} entries (async)",
            self.inner.id,
            entries.len()
        );

        for entry in &entries {
            detach(self.start_entry(entry), &entry.label());
        }
        self.complete();
    }

    async fn drive_sync(&self) -> Result<()> {
        let entries = self.inner.entries.lock().clone();
        info!(
            "[exec:{}] Running {} entries (sync)",
            self.inner.id,
            entries.len()
        );

        let mut result = Ok(());
        for entry in &entries {
            if let Err(e) = self.start_entry(entry).settle().await {
                error!("[exec:{}] {} failed: {}", self.inner.id, entry.label(), e);
                result = Err(e);
                break;
            }
        }

        match result {
            Ok(()) => {
                info!("[exec:{}] Completed", self.inner.id);
                self.complete();
                Ok(())
            }
            Err(e) => {
                self.set_status(ContextStatus::Failed);
                Err(e)
            }
        }
    }

    fn start_entry(&self, entry: &Entry) -> Outcome {
        match entry {
            Entry::Service(bound) => bound.start(),
            Entry::Callable(callable) => callable.call(self.resolve(callable.require(), None)),
        }
    }

    // ========================================================================
    // 의존성 해석
    // ========================================================================

    /// 실행 중 의존성 해석
    ///
    /// 순서: 제어 함수 → 공유 값 → Context 값(storage, storageData, logger,
    /// config) → 서비스 저장소 → 외부 모듈
    ///
    /// `storageData`는 해석 시점의 읽기 전용 스냅샷입니다. 다음 단위에 보이는
    /// 쓰기는 `storage` 핸들로만 합니다.
    pub fn resolve(&self, require: &[String], source: Option<&Service>) -> Args {
        let main = &self.inner.main;
        let control = ControlScope::new(main.clone(), &CONTROL_NAMES);

        let mut custom = MapScope::new()
            .with("storage", self.storage())
            .with("storageData", self.inner.storage.snapshot())
            .with("logger", Logger::new(format!("exec:{}", self.inner.id)));
        if let Some(configs) = source.and_then(Service::configs) {
            custom.insert_shared("config", configs.into_dependency());
        }

        Resolver::new()
            .scope(&control)
            .scope(&self.inner.sharing)
            .scope(&custom)
            .scope(&**main.services())
            .modules(main.modules())
            .resolve(require)
    }

    // ========================================================================
    // 완료
    // ========================================================================

    /// 완료 리스너 등록 (이미 completed면 즉시 호출)
    pub fn then<F>(&self, listener: F) -> &Self
    where
        F: FnOnce(Storage) + Send + 'static,
    {
        let mut guard = self.inner.listener.lock();
        let completed = self.status() == ContextStatus::Completed;
        if completed {
            drop(guard);
            listener(self.storage());
        } else {
            *guard = Some(Box::new(listener));
        }
        self
    }

    /// completed로 표시하고 리스너를 한 번 호출
    pub fn complete(&self) -> &Self {
        let listener = {
            let mut guard = self.inner.listener.lock();
            self.set_status(ContextStatus::Completed);
            guard.take()
        };
        if let Some(listener) = listener {
            listener(self.storage());
        }
        self
    }

    /// completed 또는 failed가 될 때까지 대기
    pub async fn wait(&self) -> ContextStatus {
        let mut rx = self.inner.status.subscribe();
        let settled = rx.wait_for(ContextStatus::is_settled).await.map(|status| *status);
        settled.unwrap_or_else(|_| self.status())
    }

    fn set_status(&self, status: ContextStatus) {
        self.inner.status.send_replace(status);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("mode", &self.mode())
            .field("status", &self.status())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceDefinition;
    use stater_foundation::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_then_after_complete_fires_immediately() {
        let context = Context::new(Stater::new());
        context.complete();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        context.then(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_fires_once() {
        let context = Context::new(Stater::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        context.then(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        context.complete();
        context.complete();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(context.status(), ContextStatus::Completed);
    }

    #[test]
    fn test_async_start_completes_immediately() {
        let stater = Stater::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let svc = stater
            .add_service(
                "count",
                ServiceDefinition::callable(Injectable::new("count", &["storage"], move |args| {
                    let storage = args.storage(0).ok_or("storage not injected")?;
                    storage.set("count", json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
                })),
            )
            .unwrap();
        svc.init(&stater);

        let context = Context::new(stater);
        context.insert(svc).run_async();

        assert_eq!(context.status(), ContextStatus::Completed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(context.storage().get("count"), Some(json!(1)));
    }

    #[test]
    fn test_resolve_context_values() {
        let context = Context::new(Stater::new());
        context.storage().set("user", json!("kim")).unwrap();

        let require = ["storage", "storageData", "logger", "sync"].map(String::from);
        let args = context.resolve(&require, None);

        assert!(args.storage(0).unwrap().ptr_eq(&context.storage()));
        assert_eq!(args.value(1), Some(json!({ "user": "kim" })));
        let logger = args.get::<Logger>(2).unwrap();
        assert_eq!(logger.prefix(), format!("exec:{}", context.id()));
        assert!(args.get::<Stater>(3).is_some());

        // storageData는 해석 시점 스냅샷
        context.storage().set("user", json!("lee")).unwrap();
        assert_eq!(args.value(1), Some(json!({ "user": "kim" })));
        assert_eq!(args.storage(0).unwrap().get("user"), Some(json!("lee")));
    }

    #[tokio::test]
    async fn test_sync_run_reports_illegal_start() {
        let stater = Stater::new();
        let svc = stater
            .add_service(
                "cold",
                ServiceDefinition::callable(Injectable::new("cold", &[], |_| Ok(()))),
            )
            .unwrap();

        let context = Context::new(stater);
        context.insert(svc);
        let result = context.run(RunMode::Sync).await;

        assert!(matches!(result, Err(Error::IllegalStart(_))));
        assert_eq!(context.status(), ContextStatus::Failed);
    }
}
