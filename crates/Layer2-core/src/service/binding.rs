//! BoundService - Context에 묶인 서비스 실행

use super::{detach, Injectable, Outcome, Service, ServiceUnit, Units};
use crate::context::{Context, ContextInner};
use stater_foundation::{Error, RunMode};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// 하나의 Context 안에서 실행되는 서비스
///
/// 템플릿은 공유하고 Context는 약한 참조로만 가집니다.
#[derive(Clone)]
pub struct BoundService {
    service: Arc<Service>,
    context: Weak<ContextInner>,
}

impl BoundService {
    pub(crate) fn new(service: Arc<Service>, context: Weak<ContextInner>) -> Self {
        Self { service, context }
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// 바인딩된 Context (이미 사라졌으면 InvalidContext)
    pub fn context(&self) -> stater_foundation::Result<Context> {
        self.context.upgrade().map(Context::from_inner).ok_or_else(|| {
            Error::InvalidContext(format!(
                "context of {} is no longer available",
                self.service.id()
            ))
        })
    }

    /// Context의 실행 모드로 시작
    pub fn start(&self) -> Outcome {
        match self.context() {
            Ok(context) => match context.mode() {
                RunMode::Sync => self.sync(),
                RunMode::Async => self.run_async(),
            },
            Err(e) => Outcome::Ready(Err(e)),
        }
    }

    /// 의존성을 해석하여 호출
    pub fn call(&self, callable: &Injectable) -> Outcome {
        match self.context() {
            Ok(context) => {
                let args = context.resolve(callable.require(), Some(&*self.service));
                callable.call(args)
            }
            Err(e) => Outcome::Ready(Err(e)),
        }
    }

    /// 모든 자식을 기다리지 않고 시작
    ///
    /// 초기화되지 않은 서비스는 에러를 기록하고 실행하지 않습니다.
    pub fn run_async(&self) -> Outcome {
        let id = self.service.id();
        if !self.service.is_ready() {
            error!("[{}] {}", id, Error::IllegalStart(id.clone()));
            return Outcome::ok();
        }

        match self.service.units() {
            Some(Units::Many(list)) => {
                for unit in &list {
                    detach(self.start_unit(unit), &id);
                }
            }
            Some(Units::Single(unit)) => detach(self.start_unit(&unit), &id),
            None => debug!("[{}] Nothing to run", id),
        }
        Outcome::ok()
    }

    /// 자식을 순서대로 하나씩 실행
    ///
    /// 앞선 자식의 결과가 확정된 뒤에 다음 자식을 시작하며, 실패하면 나머지는
    /// 실행하지 않고 그 에러로 끝납니다.
    pub fn sync(&self) -> Outcome {
        let id = self.service.id();
        if !self.service.is_ready() {
            return Outcome::Ready(Err(Error::IllegalStart(id)));
        }

        match self.service.units() {
            Some(Units::Many(list)) => {
                let this = self.clone();
                Outcome::Pending(Box::pin(async move {
                    for unit in list {
                        this.start_unit(&unit).settle().await?;
                    }
                    Ok(())
                }))
            }
            Some(Units::Single(unit)) => self.start_unit(&unit),
            None => Outcome::ok(),
        }
    }

    fn start_unit(&self, unit: &ServiceUnit) -> Outcome {
        match unit {
            ServiceUnit::Named(selector) => {
                warn!(
                    "[{}] {} was not resolved during init, skipping",
                    self.service.id(),
                    selector
                );
                Outcome::ok()
            }
            ServiceUnit::Service(child) => {
                BoundService::new(Arc::clone(child), self.context.clone()).start()
            }
            ServiceUnit::Callable(callable) => self.call(callable),
            ServiceUnit::Factory(factory) => {
                warn!(
                    "[{}] factory {} was never built, skipping",
                    self.service.id(),
                    factory.name()
                );
                Outcome::ok()
            }
            ServiceUnit::Handler(object) => match object.handler_fn() {
                Ok(method) => self.call(&method),
                Err(e) => {
                    error!("[{}] {}", self.service.id(), e);
                    Outcome::ok()
                }
            },
        }
    }
}

impl std::fmt::Debug for BoundService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundService")
            .field("service", &self.service.id())
            .field("attached", &(self.context.strong_count() > 0))
            .finish()
    }
}
