//! Scope - 이름으로 의존성을 찾는 조회 대상

use super::Dependency;
use crate::config::Config;
use serde_json::Value;
use stater_foundation::{get_path, Storage};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 이름 -> 의존성 조회
pub trait Scope: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Dependency>;
}

// ============================================================================
// MapScope
// ============================================================================

/// 이름 기반 맵 스코프
///
/// 점(.)이 포함된 이름은 먼저 전체 키로 찾고, 없으면 첫 세그먼트의 값 안으로
/// 투영합니다 (`helper.version`, `storage.files.0`).
#[derive(Clone, Default)]
pub struct MapScope {
    values: HashMap<String, Dependency>,
}

impl MapScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 값 추가 (Builder)
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// 값 추가
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// 이미 공유 중인 값 추가 (identity 유지)
    pub fn insert_shared(&mut self, name: impl Into<String>, value: Dependency) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Scope for MapScope {
    fn lookup(&self, name: &str) -> Option<Dependency> {
        if let Some(value) = self.values.get(name) {
            return Some(Arc::clone(value));
        }

        let (head, rest) = name.split_once('.')?;
        let base = self.values.get(head)?;
        project(base, rest)
    }
}

impl fmt::Debug for MapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapScope").field("names", &self.names()).finish()
    }
}

impl Scope for Storage {
    fn lookup(&self, name: &str) -> Option<Dependency> {
        self.get(name).map(|value| Arc::new(value) as Dependency)
    }
}

/// 의존성 값 안으로 점 경로 투영
pub fn project(base: &Dependency, path: &str) -> Option<Dependency> {
    if let Some(storage) = base.downcast_ref::<Storage>() {
        return storage.lookup(path);
    }
    if let Some(config) = base.downcast_ref::<Config>() {
        return config.get(path).map(|value| Arc::new(value) as Dependency);
    }
    if let Some(value) = base.downcast_ref::<Value>() {
        return get_path(value, path).map(|value| Arc::new(value.clone()) as Dependency);
    }
    if let Some(scope) = base.downcast_ref::<MapScope>() {
        return scope.lookup(path);
    }
    None
}
