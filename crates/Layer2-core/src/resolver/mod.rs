//! # Dependency Resolver
//!
//! 호출 대상이 선언한 이름 목록(`require`)을 순서대로 스코프에서 찾아
//! 위치 인자(`Args`)로 채웁니다.
//!
//! ```text
//! require: ["storage", "logger", "db"]
//!              │
//!   scope 1 (control)  ──▶ 없음
//!   scope 2 (sharing)  ──▶ 없음
//!   scope 3 (custom)   ──▶ storage, logger
//!   modules (fallback) ──▶ db
//! ```
//!
//! 먼저 나열된 스코프가 우선합니다. 어디서도 찾지 못한 이름은 에러가 아니라
//! 비어 있는 인자로 남습니다.

mod module;
mod scope;

pub use module::{ModuleRegistry, ModuleSource};
pub use scope::{project, MapScope, Scope};

use serde_json::Value;
use stater_foundation::{Error, Result, Storage};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 주입되는 값
pub type Dependency = Arc<dyn Any + Send + Sync>;

// ============================================================================
// Args
// ============================================================================

/// 해석된 위치 인자
#[derive(Clone, Default)]
pub struct Args {
    names: Vec<String>,
    values: Vec<Option<Dependency>>,
}

impl Args {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 선언된 이름 목록
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// 해석되지 않은 이름 목록
    pub fn unresolved(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.values)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn raw(&self, index: usize) -> Option<&Dependency> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// 타입으로 꺼내기
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.raw(index).cloned()?.downcast::<T>().ok()
    }

    /// 이름으로 꺼내기
    pub fn named<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let index = self.names.iter().position(|n| n == name)?;
        self.get(index)
    }

    /// 필수 인자 (없거나 타입이 다르면 MissingDependency)
    pub fn require<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        self.get(index).ok_or_else(|| {
            let name = self.names.get(index).map(String::as_str).unwrap_or("?");
            Error::MissingDependency(format!(
                "argument {} ({}) is missing or not a {}",
                index,
                name,
                std::any::type_name::<T>()
            ))
        })
    }

    /// JSON 값으로 꺼내기
    pub fn value(&self, index: usize) -> Option<Value> {
        self.raw(index)?.downcast_ref::<Value>().cloned()
    }

    /// Storage 핸들로 꺼내기 (같은 데이터를 공유)
    pub fn storage(&self, index: usize) -> Option<Storage> {
        self.raw(index)?.downcast_ref::<Storage>().cloned()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<(&str, bool)> = self
            .names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.as_str(), value.is_some()))
            .collect();
        f.debug_struct("Args").field("resolved", &entries).finish()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// 순서 있는 스코프 목록 + 외부 모듈 fallback
#[derive(Default)]
pub struct Resolver<'a> {
    scopes: Vec<&'a dyn Scope>,
    modules: Option<&'a dyn ModuleSource>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 스코프 추가 (먼저 추가한 스코프가 우선)
    pub fn scope(mut self, scope: &'a dyn Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// 외부 모듈 fallback 지정
    pub fn modules(mut self, modules: &'a dyn ModuleSource) -> Self {
        self.modules = Some(modules);
        self
    }

    /// 이름 하나 해석
    pub fn lookup(&self, name: &str) -> Option<Dependency> {
        self.scopes
            .iter()
            .find_map(|scope| scope.lookup(name))
            .or_else(|| self.modules.and_then(|modules| modules.load(name)))
    }

    /// 선언된 이름 목록 해석
    ///
    /// 스코프는 읽기만 하므로 같은 입력에 대해 항상 같은 결과를 냅니다.
    pub fn resolve(&self, require: &[String]) -> Args {
        let values: Vec<Option<Dependency>> =
            require.iter().map(|name| self.lookup(name)).collect();

        let args = Args {
            names: require.to_vec(),
            values,
        };

        let unresolved = args.unresolved();
        if !unresolved.is_empty() {
            debug!("Unresolved dependencies: {:?}", unresolved);
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_scope_wins() {
        let shared = MapScope::new().with("logger", "shared".to_string());
        let custom = MapScope::new()
            .with("logger", "custom".to_string())
            .with("storage", Storage::new());

        let args = Resolver::new()
            .scope(&shared)
            .scope(&custom)
            .resolve(&names(&["logger", "storage"]));

        assert_eq!(args.get::<String>(0).unwrap().as_str(), "shared");
        assert!(args.storage(1).is_some());

        let reversed = Resolver::new()
            .scope(&custom)
            .scope(&shared)
            .resolve(&names(&["logger"]));
        assert_eq!(reversed.named::<String>("logger").unwrap().as_str(), "custom");
    }

    #[test]
    fn test_module_fallback_and_unresolved() {
        let scope = MapScope::new().with("a", 1u32);
        let modules = ModuleRegistry::new();
        modules.provide("fs", json!({ "kind": "fs" }));

        let args = Resolver::new()
            .scope(&scope)
            .modules(&modules)
            .resolve(&names(&["a", "fs", "nothing"]));

        assert_eq!(args.len(), 3);
        assert_eq!(args.value(1), Some(json!({ "kind": "fs" })));
        assert!(!args.is_resolved(2));
        assert_eq!(args.unresolved(), vec!["nothing"]);
        assert!(matches!(
            args.require::<u32>(2),
            Err(Error::MissingDependency(_))
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let storage = Storage::from_value(json!({ "n": 1 })).unwrap();
        let scope = MapScope::new().with("storage", storage.clone());
        let resolver = Resolver::new().scope(&scope);

        let first = resolver.resolve(&names(&["storage", "storage.n"]));
        let second = resolver.resolve(&names(&["storage", "storage.n"]));

        assert_eq!(first.value(1), second.value(1));
        assert!(first.storage(0).unwrap().ptr_eq(&storage));
        assert_eq!(storage.snapshot(), json!({ "n": 1 }));
    }
}
