//! # Service
//!
//! 이름과 버전이 있는 실행 단위입니다. 레지스트리가 소유하는 템플릿(`Service`)과
//! Context에 묶인 가벼운 바인딩(`BoundService`)으로 나뉩니다.
//!
//! ## 상태
//!
//! ```text
//! created ──init()──▶ ready ──bind(ctx)──▶ BoundService::start()
//!                                            ├── async: 자식을 기다리지 않고 시작
//!                                            └── sync:  자식을 순서대로 하나씩
//! ```
//!
//! 실행 상태(running/completed)는 서비스가 아니라 Context가 추적합니다.

mod binding;
mod unit;

pub use binding::BoundService;
pub use unit::{Factory, HandlerObject, Injectable, Member, Outcome, ServiceUnit, Units};

pub(crate) use unit::detach;

use crate::config::Config;
use crate::context::Context;
use crate::registry::{Definition, Entity, Lookup};
use crate::runtime::Stater;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stater_foundation::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// ServiceStatus
// ============================================================================

/// 서비스 생명주기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Created,
    Ready,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Created => write!(f, "created"),
            ServiceStatus::Ready => write!(f, "ready"),
        }
    }
}

// ============================================================================
// ServiceDefinition
// ============================================================================

/// 서비스 정의
#[derive(Debug, Clone, Default)]
pub struct ServiceDefinition {
    pub version: Option<String>,
    pub units: Option<Units>,
    /// 설정 선택자 (없으면 `<name>-config@~<version>`)
    pub configs: Option<String>,
    pub include: Vec<String>,
    pub attributes: Map<String, Value>,
}

impl ServiceDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// 단일 실행 단위
    pub fn unit(unit: impl Into<ServiceUnit>) -> Self {
        Self {
            units: Some(Units::Single(unit.into())),
            ..Default::default()
        }
    }

    pub fn callable(callable: Injectable) -> Self {
        Self::unit(callable)
    }

    pub fn handler(object: HandlerObject) -> Self {
        Self::unit(object)
    }

    pub fn factory(factory: Factory) -> Self {
        Self::unit(factory)
    }

    /// 순서 있는 자식 목록
    pub fn composite<I, U>(units: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<ServiceUnit>,
    {
        Self {
            units: Some(Units::Many(units.into_iter().map(Into::into).collect())),
            ..Default::default()
        }
    }

    /// 자식 추가 (단일 단위는 목록으로 바뀜)
    pub fn child(mut self, unit: impl Into<ServiceUnit>) -> Self {
        let unit = unit.into();
        self.units = Some(match self.units.take() {
            None => Units::Many(vec![unit]),
            Some(Units::Single(first)) => Units::Many(vec![first, unit]),
            Some(Units::Many(mut list)) => {
                list.push(unit);
                Units::Many(list)
            }
        });
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn configs(mut self, selector: impl Into<String>) -> Self {
        self.configs = Some(selector.into());
        self
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

impl Definition for ServiceDefinition {
    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Default)]
struct ServiceState {
    status: ServiceStatus,
    initializing: bool,
    units: Option<Units>,
    configs_selector: Option<String>,
    configs: Option<Lookup<Config>>,
    attributes: Map<String, Value>,
}

/// 레지스트리가 소유하는 서비스 템플릿
pub struct Service {
    name: String,
    version: String,
    state: RwLock<ServiceState>,
}

impl Service {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name@version`
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.read().status
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ServiceStatus::Ready
    }

    /// 초기화가 진행 중인지 (초기화 스택 위에 있는지)
    pub fn is_initializing(&self) -> bool {
        self.state.read().initializing
    }

    /// 연결된 자식을 따라가면 `target`에 닿는지
    fn reaches(&self, target: &Service) -> bool {
        let mut visited: Vec<*const Service> = Vec::new();
        let mut stack: Vec<Arc<Service>> = self.linked_children();
        while let Some(child) = stack.pop() {
            if std::ptr::eq(&*child, target) {
                return true;
            }
            let ptr = Arc::as_ptr(&child);
            if !visited.contains(&ptr) {
                visited.push(ptr);
                stack.extend(child.linked_children());
            }
        }
        false
    }

    fn linked_children(&self) -> Vec<Arc<Service>> {
        let units = match self.units() {
            Some(Units::Many(list)) => list,
            Some(Units::Single(unit)) => vec![unit],
            None => return Vec::new(),
        };
        units
            .into_iter()
            .filter_map(|unit| match unit {
                ServiceUnit::Service(child) => Some(child),
                _ => None,
            })
            .collect()
    }

    /// 실행 단위 복사본
    pub fn units(&self) -> Option<Units> {
        self.state.read().units.clone()
    }

    /// 초기화 시 해석된 설정
    pub fn configs(&self) -> Option<Lookup<Config>> {
        self.state.read().configs.clone()
    }

    pub fn config_selector(&self) -> Option<String> {
        self.state.read().configs_selector.clone()
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.state.read().attributes.get(key).cloned()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.state.read().attributes.clone()
    }

    /// 하위 경로의 멤버 (`listen`, `server.listen`, 목록이면 `0.run`)
    pub fn get(&self, path: &str) -> Option<Member> {
        let units = self.state.read().units.clone()?;
        units.project(path)
    }

    /// Context에 묶기
    pub fn bind(self: &Arc<Self>, context: &Context) -> BoundService {
        BoundService::new(Arc::clone(self), context.downgrade())
    }

    // ========================================================================
    // 초기화
    // ========================================================================

    /// 설정을 해석하고 자식을 초기화
    ///
    /// - 이름 자식은 서비스 저장소에서 찾아 (필요하면 초기화하고) 연결
    /// - Factory는 해석된 인자로 호출하여 그 결과로 교체
    /// - 찾지 못한 자식은 에러로 보고하지만 나머지 초기화는 계속
    ///
    /// 자기 자신이나 초기화 스택 위의 서비스, 또는 이 서비스로 되돌아오는 자식은
    /// 순환으로 보고 연결하지 않습니다. 그 단위는 이름으로 남아 시작 시 건너뜁니다.
    pub fn init(&self, runtime: &Stater) {
        let (selector, units) = {
            let mut state = self.state.write();
            if state.initializing {
                debug!("[{}] Already initializing", self.id());
                return;
            }
            state.initializing = true;

            let selector = state
                .configs_selector
                .clone()
                .unwrap_or_else(|| runtime.config().config_selector(&self.name, &self.version));
            (selector, state.units.clone())
        };

        debug!("[{}] Initializing (config: {})", self.id(), selector);

        let configs = runtime.get_config(&selector);
        if configs.is_none() {
            debug!("[{}] No config found for {}", self.id(), selector);
        }

        let units = units.map(|units| match units {
            Units::Single(unit) => Units::Single(self.init_unit(unit, runtime, configs.as_ref())),
            Units::Many(list) => Units::Many(
                list.into_iter()
                    .map(|unit| self.init_unit(unit, runtime, configs.as_ref()))
                    .collect(),
            ),
        });

        let mut state = self.state.write();
        state.units = units;
        state.configs = configs;
        state.status = ServiceStatus::Ready;
        state.initializing = false;

        debug!("[{}] Initialized", self.id());
    }

    fn init_unit(
        &self,
        unit: ServiceUnit,
        runtime: &Stater,
        configs: Option<&Lookup<Config>>,
    ) -> ServiceUnit {
        match unit {
            ServiceUnit::Named(selector) => match runtime.get_service(&selector) {
                Some(Lookup::Entity(child)) => {
                    if child.is_initializing() || child.reaches(self) {
                        self.report(Error::MissingDependency(format!(
                            "service {} required by {} forms a cycle",
                            selector,
                            self.id()
                        )));
                        return ServiceUnit::Named(selector);
                    }
                    if child.status() == ServiceStatus::Created {
                        child.init(runtime);
                    }
                    ServiceUnit::Service(child)
                }
                Some(Lookup::Projection(member)) => match ServiceUnit::from_member(member) {
                    Some(unit) => unit,
                    None => {
                        self.report(Error::invalid_handler(&selector, &selector));
                        ServiceUnit::Named(selector)
                    }
                },
                None => {
                    self.report(Error::MissingDependency(format!(
                        "service {} required by {} cannot be found",
                        selector,
                        self.id()
                    )));
                    ServiceUnit::Named(selector)
                }
            },
            ServiceUnit::Factory(factory) => {
                let args = runtime.init_args(factory.require(), configs);
                match factory.build(args) {
                    Ok(built) => {
                        debug!("[{}] Built {}", self.id(), factory.name());
                        built
                    }
                    Err(e) => {
                        debug!("[{}] Factory {} was not built", self.id(), factory.name());
                        self.report(e);
                        ServiceUnit::Factory(factory)
                    }
                }
            }
            other => other,
        }
    }

    /// 초기화 에러 보고 (초기화는 계속)
    fn report(&self, e: Error) {
        if e.is_init_recoverable() {
            warn!("[{}] {}, left unresolved", self.id(), e);
        } else {
            error!("[{}] Init failed: {}", self.id(), e);
        }
    }
}

impl Entity for Service {
    type Definition = ServiceDefinition;
    type Projection = Member;

    fn create(name: &str, version: &str, definition: ServiceDefinition) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            state: RwLock::new(ServiceState {
                units: definition.units,
                configs_selector: definition.configs,
                attributes: definition.attributes,
                ..Default::default()
            }),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    /// 단위가 바뀌면 다시 초기화해야 하므로 created로 되돌립니다.
    fn merge(&self, definition: ServiceDefinition) -> Result<()> {
        let mut state = self.state.write();
        if let Some(units) = definition.units {
            state.units = Some(units);
            state.status = ServiceStatus::Created;
        }
        if let Some(selector) = definition.configs {
            state.configs_selector = Some(selector);
        }
        state.attributes.extend(definition.attributes);
        Ok(())
    }

    fn project(&self, path: &str) -> Option<Member> {
        self.get(path)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("status", &state.status)
            .field("units", &state.units.as_ref().map(Units::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigDefinition;
    use crate::resolver::Args;
    use parking_lot::Mutex;
    use serde_json::json;

    fn noop(name: &str) -> Injectable {
        Injectable::new(name, &[], |_| Ok(()))
    }

    #[test]
    fn test_definition_child_builder() {
        let def = ServiceDefinition::callable(noop("a"))
            .child("b")
            .child(noop("c"))
            .version("2.0.0");

        match def.units {
            Some(Units::Many(ref list)) => assert_eq!(list.len(), 3),
            _ => panic!("expected composite units"),
        }
        assert_eq!(def.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_init_links_named_children_and_configs() {
        let stater = Stater::new();
        stater
            .add_config("app-config", ConfigDefinition::new(json!({ "port": 80 })).version("1.0.0"))
            .unwrap();
        let child = stater
            .add_service("db", ServiceDefinition::callable(noop("db")))
            .unwrap();
        let app = stater
            .add_service("app", ServiceDefinition::composite(["db", "missing"]))
            .unwrap();

        app.init(&stater);

        assert!(app.is_ready());
        assert!(child.is_ready());
        match app.units() {
            Some(Units::Many(list)) => {
                assert!(matches!(list[0], ServiceUnit::Service(ref s) if Arc::ptr_eq(s, &child)));
                assert!(matches!(list[1], ServiceUnit::Named(ref n) if n == "missing"));
            }
            _ => panic!("expected composite units"),
        }

        let config = app.configs().and_then(Lookup::entity).unwrap();
        assert_eq!(config.get("port"), Some(json!(80)));
    }

    #[test]
    fn test_init_builds_factory_with_config() {
        let stater = Stater::new();
        stater
            .add_config("cache-config", ConfigDefinition::new(json!({ "size": 16 })))
            .unwrap();

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let factory = Factory::new("make", &["config", "logger"], move |args: Args| {
            let config = args.require::<Config>(0)?;
            *sink.lock() = config.get("size");
            Ok(ServiceUnit::Callable(Injectable::new("built", &[], |_| Ok(()))))
        });

        let cache = stater
            .add_service("cache", ServiceDefinition::factory(factory))
            .unwrap();
        cache.init(&stater);

        assert_eq!(*seen.lock(), Some(json!(16)));
        assert!(matches!(
            cache.units(),
            Some(Units::Single(ServiceUnit::Callable(ref c))) if c.name() == "built"
        ));
    }

    #[test]
    fn test_init_self_reference_is_left_unresolved() {
        let stater = Stater::new();
        let looped = stater
            .add_service("loop", ServiceDefinition::composite(["loop"]))
            .unwrap();

        looped.init(&stater);

        assert!(looped.is_ready());
        assert!(!looped.is_initializing());
        match looped.units() {
            Some(Units::Many(list)) => {
                assert!(matches!(list[0], ServiceUnit::Named(ref n) if n == "loop"));
            }
            _ => panic!("expected composite units"),
        }
    }

    #[test]
    fn test_init_mutual_cycle_is_broken() {
        let stater = Stater::new();
        let a = stater
            .add_service("a", ServiceDefinition::composite(["b"]))
            .unwrap();
        let b = stater
            .add_service("b", ServiceDefinition::composite(["a"]))
            .unwrap();

        a.init(&stater);

        assert!(a.is_ready());
        assert!(b.is_ready());
        assert!(matches!(
            a.units(),
            Some(Units::Many(ref list)) if matches!(list[0], ServiceUnit::Service(_))
        ));
        assert!(matches!(
            b.units(),
            Some(Units::Many(ref list)) if matches!(list[0], ServiceUnit::Named(ref n) if n == "a")
        ));
    }

    #[test]
    fn test_reinit_does_not_close_cycle() {
        let stater = Stater::new();
        let a = stater
            .add_service("a", ServiceDefinition::composite(["b"]))
            .unwrap();
        let b = stater
            .add_service("b", ServiceDefinition::callable(noop("b")))
            .unwrap();
        a.init(&stater);

        // b가 a를 가리키도록 바뀌어도 a -> b -> a 연결은 만들지 않음
        stater
            .add_service("b", ServiceDefinition::composite(["a"]))
            .unwrap();
        b.init(&stater);

        assert!(b.is_ready());
        assert!(matches!(
            b.units(),
            Some(Units::Many(ref list)) if matches!(list[0], ServiceUnit::Named(ref n) if n == "a")
        ));
    }

    #[test]
    fn test_merge_resets_status_when_units_change() {
        let stater = Stater::new();
        let svc = stater
            .add_service("svc", ServiceDefinition::callable(noop("a")))
            .unwrap();
        svc.init(&stater);
        assert!(svc.is_ready());

        stater
            .add_service("svc", ServiceDefinition::new().attr("tag", json!("x")))
            .unwrap();
        assert!(svc.is_ready());
        assert_eq!(svc.attribute("tag"), Some(json!("x")));

        stater
            .add_service("svc", ServiceDefinition::callable(noop("b")))
            .unwrap();
        assert_eq!(svc.status(), ServiceStatus::Created);
    }

    #[test]
    fn test_service_projection() {
        let stater = Stater::new();
        stater
            .add_service(
                "http",
                ServiceDefinition::handler(
                    HandlerObject::new("http")
                        .handler("listen")
                        .method("listen", noop("listen")),
                ),
            )
            .unwrap();

        let found = stater.get_service("http/listen").unwrap();
        assert!(matches!(found, Lookup::Projection(Member::Method(_))));
    }
}
