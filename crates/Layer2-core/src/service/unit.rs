//! Service units - 서비스를 구성하는 실행 단위
//!
//! ```text
//! ServiceUnit
//! ├── Named(String)          초기화 전 이름 참조 ("db@~1.0.0")
//! ├── Service(Arc<Service>)  다른 서비스
//! ├── Callable(Injectable)   require 목록이 붙은 함수
//! ├── Factory(Factory)       초기화 시 호출 결과로 교체되는 함수
//! └── Handler(HandlerObject) handler 경로로 메서드를 고르는 객체
//! ```

use super::Service;
use crate::resolver::Args;
use futures::future::BoxFuture;
use serde_json::Value;
use stater_foundation::{get_path, Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

// ============================================================================
// Outcome
// ============================================================================

/// 호출 결과: 즉시 완료 또는 대기 중인 비동기 작업
pub enum Outcome {
    Ready(Result<()>),
    Pending(BoxFuture<'static, Result<()>>),
}

impl Outcome {
    pub fn ok() -> Self {
        Outcome::Ready(Ok(()))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    /// 결과가 확정될 때까지 대기
    pub async fn settle(self) -> Result<()> {
        match self {
            Outcome::Ready(result) => result,
            Outcome::Pending(future) => future.await,
        }
    }
}

impl From<Result<()>> for Outcome {
    fn from(result: Result<()>) -> Self {
        Outcome::Ready(result)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Outcome::Pending(_) => write!(f, "Pending"),
        }
    }
}

/// 기다리지 않고 결과를 버림 (실패는 로그로만 보고)
pub(crate) fn detach(outcome: Outcome, label: &str) {
    match outcome {
        Outcome::Ready(Ok(())) => {}
        Outcome::Ready(Err(e)) => error!("[{}] {}", label, e),
        Outcome::Pending(future) => match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let label = label.to_string();
                handle.spawn(async move {
                    if let Err(e) = future.await {
                        error!("[{}] {}", label, e);
                    }
                });
            }
            Err(_) => error!(
                "[{}] pending result dropped: no async runtime is available",
                label
            ),
        },
    }
}

// ============================================================================
// Injectable
// ============================================================================

type CallFn = Arc<dyn Fn(Args) -> Outcome + Send + Sync>;

/// 의존성 이름 목록이 붙은 호출 대상
#[derive(Clone)]
pub struct Injectable {
    name: String,
    require: Vec<String>,
    func: CallFn,
}

impl Injectable {
    /// 즉시 완료되는 함수
    pub fn new<F>(name: impl Into<String>, require: &[&str], func: F) -> Self
    where
        F: Fn(Args) -> Result<()> + Send + Sync + 'static,
    {
        Self::from_outcome(name, require, move |args| Outcome::Ready(func(args)))
    }

    /// 비동기 결과를 돌려주는 함수
    pub fn pending<F, Fut>(name: impl Into<String>, require: &[&str], func: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::from_outcome(name, require, move |args| Outcome::Pending(Box::pin(func(args))))
    }

    /// Outcome을 직접 고르는 함수
    pub fn from_outcome<F>(name: impl Into<String>, require: &[&str], func: F) -> Self
    where
        F: Fn(Args) -> Outcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            require: require.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn require(&self) -> &[String] {
        &self.require
    }

    pub fn call(&self, args: Args) -> Outcome {
        (self.func)(args)
    }
}

impl fmt::Debug for Injectable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injectable")
            .field("name", &self.name)
            .field("require", &self.require)
            .finish()
    }
}

// ============================================================================
// Factory
// ============================================================================

type BuildFn = Arc<dyn Fn(Args) -> Result<ServiceUnit> + Send + Sync>;

/// 초기화 시 해석된 인자로 호출되어 그 결과로 교체되는 함수
#[derive(Clone)]
pub struct Factory {
    name: String,
    require: Vec<String>,
    build: BuildFn,
}

impl Factory {
    pub fn new<F>(name: impl Into<String>, require: &[&str], build: F) -> Self
    where
        F: Fn(Args) -> Result<ServiceUnit> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            require: require.iter().map(|s| s.to_string()).collect(),
            build: Arc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn require(&self) -> &[String] {
        &self.require
    }

    pub fn build(&self, args: Args) -> Result<ServiceUnit> {
        (self.build)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name)
            .field("require", &self.require)
            .finish()
    }
}

// ============================================================================
// HandlerObject
// ============================================================================

/// 객체 멤버
#[derive(Debug, Clone)]
pub enum Member {
    Method(Injectable),
    Object(HandlerObject),
    Value(Value),
}

/// 메서드 모음 + 시작 시 호출할 handler 경로
#[derive(Debug, Clone, Default)]
pub struct HandlerObject {
    name: String,
    handler: Option<String>,
    members: BTreeMap<String, Member>,
}

impl HandlerObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 시작 시 호출할 메서드 경로 (`listen`, `server.listen`)
    pub fn handler(mut self, path: impl Into<String>) -> Self {
        self.handler = Some(path.into());
        self
    }

    pub fn method(mut self, name: impl Into<String>, method: Injectable) -> Self {
        self.members.insert(name.into(), Member::Method(method));
        self
    }

    pub fn object(mut self, name: impl Into<String>, object: HandlerObject) -> Self {
        self.members.insert(name.into(), Member::Object(object));
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.members.insert(name.into(), Member::Value(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler_path(&self) -> Option<&str> {
        self.handler.as_deref()
    }

    /// 점 경로로 멤버 조회
    pub fn get(&self, path: &str) -> Option<Member> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let member = self.members.get(head)?;
        match (member, rest) {
            (member, None) => Some(member.clone()),
            (Member::Object(object), Some(rest)) => object.get(rest),
            (Member::Value(value), Some(rest)) => get_path(value, rest).cloned().map(Member::Value),
            (Member::Method(_), Some(_)) => None,
        }
    }

    /// handler 경로의 메서드
    pub fn handler_fn(&self) -> Result<Injectable> {
        let path = self
            .handler
            .as_deref()
            .ok_or_else(|| Error::invalid_handler(&self.name, "<none>"))?;

        match self.get(path) {
            Some(Member::Method(method)) => Ok(method),
            _ => Err(Error::invalid_handler(&self.name, path)),
        }
    }
}

// ============================================================================
// ServiceUnit
// ============================================================================

/// 서비스 실행 단위
#[derive(Debug, Clone)]
pub enum ServiceUnit {
    Named(String),
    Service(Arc<Service>),
    Callable(Injectable),
    Factory(Factory),
    Handler(HandlerObject),
}

impl ServiceUnit {
    pub fn named(selector: impl Into<String>) -> Self {
        ServiceUnit::Named(selector.into())
    }

    /// 로그용 이름
    pub fn label(&self) -> String {
        match self {
            ServiceUnit::Named(selector) => selector.clone(),
            ServiceUnit::Service(service) => format!("{}@{}", service.name(), service.version()),
            ServiceUnit::Callable(callable) => callable.name().to_string(),
            ServiceUnit::Factory(factory) => factory.name().to_string(),
            ServiceUnit::Handler(object) => object.name().to_string(),
        }
    }

    /// 하위 경로 투영
    pub(crate) fn project(&self, path: &str) -> Option<Member> {
        match self {
            ServiceUnit::Handler(object) => object.get(path),
            ServiceUnit::Service(service) => service.get(path),
            _ => None,
        }
    }

    /// 투영된 멤버를 실행 단위로 변환 (값은 실행할 수 없음)
    pub(crate) fn from_member(member: Member) -> Option<Self> {
        match member {
            Member::Method(callable) => Some(ServiceUnit::Callable(callable)),
            Member::Object(object) => Some(ServiceUnit::Handler(object)),
            Member::Value(_) => None,
        }
    }

    fn into_member(self) -> Option<Member> {
        match self {
            ServiceUnit::Callable(callable) => Some(Member::Method(callable)),
            ServiceUnit::Handler(object) => Some(Member::Object(object)),
            _ => None,
        }
    }
}

impl From<Injectable> for ServiceUnit {
    fn from(callable: Injectable) -> Self {
        ServiceUnit::Callable(callable)
    }
}

impl From<Factory> for ServiceUnit {
    fn from(factory: Factory) -> Self {
        ServiceUnit::Factory(factory)
    }
}

impl From<HandlerObject> for ServiceUnit {
    fn from(object: HandlerObject) -> Self {
        ServiceUnit::Handler(object)
    }
}

impl From<Arc<Service>> for ServiceUnit {
    fn from(service: Arc<Service>) -> Self {
        ServiceUnit::Service(service)
    }
}

impl From<&str> for ServiceUnit {
    fn from(selector: &str) -> Self {
        ServiceUnit::Named(selector.to_string())
    }
}

/// 서비스가 감싸는 단위: 하나 또는 순서 있는 목록
#[derive(Debug, Clone)]
pub enum Units {
    Single(ServiceUnit),
    Many(Vec<ServiceUnit>),
}

impl Units {
    /// 하위 경로 투영 (목록은 첫 세그먼트를 인덱스로 사용)
    pub(crate) fn project(&self, path: &str) -> Option<Member> {
        match self {
            Units::Single(unit) => unit.project(path),
            Units::Many(list) => {
                let (head, rest) = match path.split_once('.') {
                    Some((head, rest)) => (head, Some(rest)),
                    None => (path, None),
                };
                let unit = list.get(head.parse::<usize>().ok()?)?;
                match rest {
                    Some(rest) => unit.project(rest),
                    None => unit.clone().into_member(),
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Units::Single(_) => 1,
            Units::Many(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
