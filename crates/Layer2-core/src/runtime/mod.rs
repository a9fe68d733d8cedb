//! # Stater Runtime
//!
//! 서비스 저장소, 설정 저장소, 헬퍼, 외부 모듈을 묶는 최상위 핸들입니다.
//!
//! ```text
//! Stater
//! ├── bootstrap(pattern)   정의 파일 로드          → bootstrapped
//! ├── initialize()         created 서비스 초기화    → ready
//! └── start(selector, ..)  Context 생성 후 실행
//! ```
//!
//! 주입 가능한 제어 함수(`sync`, `async`, `start`, ...)는 모두 이 핸들을
//! 가리킵니다.

mod helper;
mod loader;

pub use helper::{ObjectHelper, StorageClass, VersionHelper};
pub use loader::Module;

use crate::config::{Config, ConfigDefinition, ConfigStore};
use crate::context::Context;
use crate::registry::{Lookup, VersionedRegistry};
use crate::resolver::{Args, Dependency, MapScope, ModuleRegistry, Resolver, Scope};
use crate::service::{Injectable, Outcome, Service, ServiceDefinition};
use crate::store::{InitialData, Selector, ServiceStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stater_foundation::{Logger, Result, RunMode, RuntimeConfig};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// 실행 중 주입되는 제어 함수 이름
pub const CONTROL_NAMES: [&str; 8] = [
    "sync",
    "async",
    "start",
    "getConfig",
    "getService",
    "getClass",
    "getHelper",
    "resolve",
];

/// 초기화 중 주입되는 제어 함수 이름
pub const INIT_CONTROL_NAMES: [&str; 3] = ["sync", "async", "start"];

// ============================================================================
// StaterStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaterStatus {
    #[default]
    Created,
    Bootstrapped,
    Ready,
}

impl fmt::Display for StaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaterStatus::Created => write!(f, "created"),
            StaterStatus::Bootstrapped => write!(f, "bootstrapped"),
            StaterStatus::Ready => write!(f, "ready"),
        }
    }
}

// ============================================================================
// ControlScope
// ============================================================================

/// 제어 함수 이름을 런타임 핸들로 해석
pub struct ControlScope {
    runtime: Stater,
    names: &'static [&'static str],
}

impl ControlScope {
    pub fn new(runtime: Stater, names: &'static [&'static str]) -> Self {
        Self { runtime, names }
    }
}

impl Scope for ControlScope {
    fn lookup(&self, name: &str) -> Option<Dependency> {
        self.names
            .iter()
            .any(|control| *control == name)
            .then(|| Arc::new(self.runtime.clone()) as Dependency)
    }
}

// ============================================================================
// Stater
// ============================================================================

pub(crate) struct StaterInner {
    config: RuntimeConfig,
    status: RwLock<StaterStatus>,
    services: Arc<ServiceStore>,
    configs: Arc<ConfigStore>,
    helpers: Arc<MapScope>,
    classes: MapScope,
    modules: ModuleRegistry,
}

/// 런타임 핸들 (복제해도 같은 런타임을 가리킴)
#[derive(Clone)]
pub struct Stater {
    inner: Arc<StaterInner>,
}

impl Default for Stater {
    fn default() -> Self {
        Self::new()
    }
}

impl Stater {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> StaterBuilder {
        StaterBuilder::default()
    }

    pub(crate) fn from_inner(inner: Arc<StaterInner>) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StaterStatus {
        *self.inner.status.read()
    }

    fn set_status(&self, status: StaterStatus) {
        *self.inner.status.write() = status;
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn services(&self) -> &Arc<ServiceStore> {
        &self.inner.services
    }

    pub fn configs(&self) -> &Arc<ConfigStore> {
        &self.inner.configs
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.inner.modules
    }

    pub fn helpers(&self) -> &Arc<MapScope> {
        &self.inner.helpers
    }

    /// 외부 모듈 등록
    pub fn provide_module<T: Any + Send + Sync>(&self, name: impl Into<String>, module: T) {
        self.inner.modules.provide(name, module);
    }

    // ========================================================================
    // 등록
    // ========================================================================

    pub fn add_service(&self, name: &str, definition: ServiceDefinition) -> Result<Arc<Service>> {
        self.inner.services.add(name, definition)
    }

    pub fn add_config(&self, name: &str, definition: ConfigDefinition) -> Result<Arc<Config>> {
        self.inner.configs.add(name, definition)
    }

    // ========================================================================
    // 생명주기
    // ========================================================================

    /// created 상태인 서비스를 모두 초기화하고 ready로 전환
    pub fn initialize(&self) -> usize {
        let count = self.inner.services.init(self);
        self.set_status(StaterStatus::Ready);
        info!("[stater] Ready ({} services initialized)", count);
        count
    }

    /// 선택한 대상을 새 Context에서 실행
    ///
    /// 모드를 생략하면 설정의 기본 모드를 사용합니다.
    pub fn start(
        &self,
        selector: impl Into<Selector>,
        data: impl Into<InitialData>,
        mode: Option<RunMode>,
    ) -> Result<Context> {
        let mode = mode.unwrap_or(self.inner.config.default_mode);
        self.inner.services.start(selector, data, mode)
    }

    pub fn sync(&self, selector: impl Into<Selector>, data: impl Into<InitialData>) -> Result<Context> {
        self.start(selector, data, Some(RunMode::Sync))
    }

    pub fn run_async(
        &self,
        selector: impl Into<Selector>,
        data: impl Into<InitialData>,
    ) -> Result<Context> {
        self.start(selector, data, Some(RunMode::Async))
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn get_config(&self, selector: &str) -> Option<Lookup<Config>> {
        self.inner.configs.get(selector)
    }

    pub fn get_service(&self, selector: &str) -> Option<Lookup<Service>> {
        self.inner.services.get(selector)
    }

    pub fn get_class(&self, name: &str) -> Option<Dependency> {
        self.inner.classes.lookup(name)
    }

    pub fn get_helper(&self, name: &str) -> Option<Dependency> {
        self.inner.helpers.lookup(name)
    }

    // ========================================================================
    // 의존성 해석
    // ========================================================================

    /// 모든 스코프가 공유하는 값 (`$stater`, `$serviceStore`, `$configsStore`, `helper`)
    pub(crate) fn shared_scope(&self) -> MapScope {
        let mut scope = MapScope::new();
        scope.insert("$stater", self.clone());
        scope.insert_shared("$serviceStore", Arc::clone(&self.inner.services) as Dependency);
        scope.insert_shared("$configsStore", Arc::clone(&self.inner.configs) as Dependency);
        scope.insert_shared("helper", Arc::clone(&self.inner.helpers) as Dependency);
        scope
    }

    /// 초기화 중 해석 (Factory 인자)
    ///
    /// 순서: 제어 함수(sync, async, start) → 공유 값 + `logger`(init) + `config`
    /// → `configs` → 외부 모듈
    pub(crate) fn init_args(&self, require: &[String], configs: Option<&Lookup<Config>>) -> Args {
        let control = ControlScope::new(self.clone(), &INIT_CONTROL_NAMES);
        let mut shared = self.shared_scope().with("logger", Logger::new("init"));
        let mut custom = MapScope::new();
        if let Some(configs) = configs {
            shared.insert_shared("config", configs.clone().into_dependency());
            custom.insert_shared("configs", configs.clone().into_dependency());
        }

        Resolver::new()
            .scope(&control)
            .scope(&shared)
            .scope(&custom)
            .modules(&self.inner.modules)
            .resolve(require)
    }

    /// Context 밖에서 호출 대상의 의존성 해석
    ///
    /// `logger`의 prefix는 호출 대상 이름이며, 이름이 없으면 `private`입니다.
    pub fn resolve(&self, callable: &Injectable) -> Args {
        let prefix = match callable.name() {
            "" => "private",
            name => name,
        };
        let control = ControlScope::new(self.clone(), &CONTROL_NAMES);
        let shared = self.shared_scope().with("logger", Logger::new(prefix));

        Resolver::new()
            .scope(&control)
            .scope(&shared)
            .modules(&self.inner.modules)
            .resolve(callable.require())
    }

    /// 의존성을 해석하여 바로 호출
    pub fn invoke(&self, callable: &Injectable) -> Outcome {
        callable.call(self.resolve(callable))
    }
}

impl fmt::Debug for Stater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stater")
            .field("status", &self.status())
            .field("services", &self.inner.services.len())
            .field("configs", &self.inner.configs.len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// 런타임 빌더
#[derive(Default)]
pub struct StaterBuilder {
    config: Option<RuntimeConfig>,
    helpers: Vec<(String, Dependency)>,
    classes: Vec<(String, Dependency)>,
    modules: Vec<(String, Dependency)>,
}

impl StaterBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 헬퍼 추가 (같은 이름의 기본 헬퍼는 교체)
    pub fn helper<T: Any + Send + Sync>(mut self, name: impl Into<String>, helper: T) -> Self {
        self.helpers.push((name.into(), Arc::new(helper)));
        self
    }

    pub fn class<T: Any + Send + Sync>(mut self, name: impl Into<String>, class: T) -> Self {
        self.classes.push((name.into(), Arc::new(class)));
        self
    }

    pub fn module<T: Any + Send + Sync>(mut self, name: impl Into<String>, module: T) -> Self {
        self.modules.push((name.into(), Arc::new(module)));
        self
    }

    pub fn build(self) -> Stater {
        let config = self.config.unwrap_or_default();

        let mut helpers = helper::default_helpers();
        for (name, value) in self.helpers {
            helpers.insert_shared(name, value);
        }
        let mut classes = helper::default_classes();
        for (name, value) in self.classes {
            classes.insert_shared(name, value);
        }
        let modules = ModuleRegistry::new();
        for (name, value) in self.modules {
            modules.provide_shared(name, value);
        }

        let default_version = config.default_version.clone();
        let inner = Arc::new_cyclic(|main| StaterInner {
            status: RwLock::new(StaterStatus::Created),
            services: Arc::new(ServiceStore::new(&default_version, main.clone())),
            configs: Arc::new(VersionedRegistry::with_default_version(
                "configs",
                &default_version,
            )),
            helpers: Arc::new(helpers),
            classes,
            modules,
            config,
        });

        Stater { inner }
    }
}
