//! ServiceStore - 서비스 레지스트리 + Context 생성

use crate::context::Context;
use crate::registry::{Lookup, VersionedRegistry};
use crate::resolver::{Dependency, Scope};
use crate::runtime::{Stater, StaterInner};
use crate::service::{Injectable, Member, Service, ServiceDefinition, ServiceStatus};
use serde_json::Value;
use stater_foundation::{kind_of, Error, Result, RunMode, Storage};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

// ============================================================================
// Selector / InitialData
// ============================================================================

/// 실행 대상 선택
#[derive(Debug, Clone)]
pub enum Selector {
    /// 서비스 요청 문자열 (`http@~1.0.0`, `http/listen`)
    Name(String),
    Callable(Injectable),
    Many(Vec<Selector>),
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<Injectable> for Selector {
    fn from(callable: Injectable) -> Self {
        Selector::Callable(callable)
    }
}

impl<T: Into<Selector>> From<Vec<T>> for Selector {
    fn from(list: Vec<T>) -> Self {
        Selector::Many(list.into_iter().map(Into::into).collect())
    }
}

/// Context의 초기 데이터
#[derive(Debug, Clone, Default)]
pub enum InitialData {
    #[default]
    Empty,
    /// 새 Storage의 내용으로 사용
    Data(Value),
    /// 기존 Storage를 그대로 공유
    Shared(Storage),
}

impl From<()> for InitialData {
    fn from(_: ()) -> Self {
        InitialData::Empty
    }
}

impl From<Value> for InitialData {
    fn from(value: Value) -> Self {
        InitialData::Data(value)
    }
}

impl From<Storage> for InitialData {
    fn from(storage: Storage) -> Self {
        InitialData::Shared(storage)
    }
}

impl From<Option<Value>> for InitialData {
    fn from(value: Option<Value>) -> Self {
        value.map_or(InitialData::Empty, InitialData::Data)
    }
}

// ============================================================================
// ServiceStore
// ============================================================================

/// 서비스 저장소
pub struct ServiceStore {
    registry: VersionedRegistry<Service>,
    main: Weak<StaterInner>,
}

impl ServiceStore {
    pub(crate) fn new(default_version: &str, main: Weak<StaterInner>) -> Self {
        Self {
            registry: VersionedRegistry::with_default_version("services", default_version),
            main,
        }
    }

    fn main(&self) -> Result<Stater> {
        self.main
            .upgrade()
            .map(Stater::from_inner)
            .ok_or_else(|| Error::InvalidContext("runtime is no longer available".into()))
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// 서비스 추가 (같은 이름/버전이면 병합)
    pub fn add(&self, name: &str, definition: ServiceDefinition) -> Result<Arc<Service>> {
        self.registry.add(name, definition)
    }

    /// 서비스 또는 서비스 하위 멤버 조회
    pub fn get(&self, request: &str) -> Option<Lookup<Service>> {
        self.registry.get(request)
    }

    pub fn get_entity(&self, request: &str) -> Option<Arc<Service>> {
        self.registry.get_entity(request)
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn versions(&self, name: &str) -> Vec<String> {
        self.registry.versions(name)
    }

    pub fn entities(&self) -> Vec<Arc<Service>> {
        self.registry.entities()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// 아직 created인 서비스를 모두 초기화하고 그 수를 반환
    pub fn init(&self, runtime: &Stater) -> usize {
        let mut count = 0;
        for service in self.registry.entities() {
            if service.status() == ServiceStatus::Created {
                service.init(runtime);
                count += 1;
            }
        }
        debug!("[services] Initialized {} services", count);
        count
    }

    // ========================================================================
    // 실행
    // ========================================================================

    /// Context를 만들어 선택한 대상을 넣고 시작
    ///
    /// 찾지 못한 이름은 경고 후 건너뜁니다.
    pub fn start(
        &self,
        selector: impl Into<Selector>,
        data: impl Into<InitialData>,
        mode: RunMode,
    ) -> Result<Context> {
        let main = self.main()?;
        let context = match data.into() {
            InitialData::Empty => Context::new(main),
            InitialData::Shared(storage) => Context::with_storage(main, storage),
            InitialData::Data(value) => {
                let context = Context::new(main);
                match value {
                    Value::Null => {}
                    Value::Object(_) => context.storage().replace(value)?,
                    other => warn!(
                        "[services] initial data must be an object, got {}; ignored",
                        kind_of(&other)
                    ),
                }
                context
            }
        };

        self.insert_selector(&context, selector.into());
        info!(
            "[services] Starting context {} with {} entries ({})",
            context.id(),
            context.len(),
            mode
        );
        context.start(mode);
        Ok(context)
    }

    pub fn sync(
        &self,
        selector: impl Into<Selector>,
        data: impl Into<InitialData>,
    ) -> Result<Context> {
        self.start(selector, data, RunMode::Sync)
    }

    pub fn run_async(
        &self,
        selector: impl Into<Selector>,
        data: impl Into<InitialData>,
    ) -> Result<Context> {
        self.start(selector, data, RunMode::Async)
    }

    fn insert_selector(&self, context: &Context, selector: Selector) {
        match selector {
            Selector::Name(name) => match self.get(&name) {
                Some(Lookup::Entity(service)) => {
                    context.insert(service);
                }
                Some(Lookup::Projection(Member::Method(callable))) => {
                    context.insert(callable);
                }
                Some(Lookup::Projection(Member::Object(object))) => match object.handler_fn() {
                    Ok(method) => {
                        context.insert(method);
                    }
                    Err(e) => warn!("[services] {}; skipping {}", e, name),
                },
                Some(Lookup::Projection(Member::Value(_))) => {
                    warn!("[services] {} is not runnable, skipping", name)
                }
                None => warn!(
                    "[services] {}",
                    Error::MissingDependency(format!("service {} cannot be found", name))
                ),
            },
            Selector::Callable(callable) => {
                context.insert(callable);
            }
            Selector::Many(list) => {
                for selector in list {
                    self.insert_selector(context, selector);
                }
            }
        }
    }
}

impl Scope for ServiceStore {
    fn lookup(&self, name: &str) -> Option<Dependency> {
        self.get(name).map(Lookup::into_dependency)
    }
}

impl std::fmt::Debug for ServiceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStore")
            .field("services", &self.registry.names())
            .finish()
    }
}
