//! External modules - 어떤 스코프에서도 찾지 못한 이름의 마지막 조회 대상

use super::{Dependency, Scope};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 외부 모듈 제공자
pub trait ModuleSource: Send + Sync {
    fn load(&self, name: &str) -> Option<Dependency>;
}

/// 이름으로 등록하는 모듈 저장소
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Dependency>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모듈 등록 (같은 이름은 교체)
    pub fn provide<T: Any + Send + Sync>(&self, name: impl Into<String>, module: T) {
        self.provide_shared(name, Arc::new(module));
    }

    pub fn provide_shared(&self, name: impl Into<String>, module: Dependency) {
        let name = name.into();
        debug!("[modules] Provided: {}", name);
        self.modules.write().insert(name, module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl ModuleSource for ModuleRegistry {
    fn load(&self, name: &str) -> Option<Dependency> {
        self.modules.read().get(name).cloned()
    }
}

impl Scope for ModuleRegistry {
    fn lookup(&self, name: &str) -> Option<Dependency> {
        self.load(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provide_and_load() {
        let modules = ModuleRegistry::new();
        modules.provide("path-sep", '/');

        let sep = modules.load("path-sep").unwrap();
        assert_eq!(sep.downcast_ref::<char>(), Some(&'/'));
        assert!(modules.load("fs").is_none());

        modules.provide("path-sep", '\\');
        assert_eq!(modules.len(), 1);
    }
}
