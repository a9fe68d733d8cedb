//! Storage - 이름 기반 데이터 컨테이너
//!
//! - `path`: 점(.) 경로 기반 get/set/list/merge 헬퍼
//! - `Storage`: 서비스들이 공유하는 가변 컨테이너 (clone 시 같은 데이터를 공유)

pub mod path;

use crate::{Error, Result};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub use path::{get_path, kind_of, list_paths, merge_value, set_path};

struct StorageInner {
    data: Value,
    readonly: HashSet<String>,
}

/// 공유 데이터 컨테이너
///
/// `clone()`은 같은 데이터를 가리키는 핸들을 만듭니다. 하나의 Context에 속한
/// 모든 서비스가 이 핸들로 데이터를 주고받습니다. 잠금은 각 연산 내부에서만
/// 잡히므로 여러 연산 사이의 일관성은 호출 순서(sync 모드)로만 보장됩니다.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<RwLock<StorageInner>>,
}

impl Storage {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StorageInner {
                data: Value::Object(Map::new()),
                readonly: HashSet::new(),
            })),
        }
    }

    /// JSON 객체로부터 생성
    pub fn from_value(data: Value) -> Result<Self> {
        match data {
            Value::Object(_) => {
                let storage = Self::new();
                storage.inner.write().data = data;
                Ok(storage)
            }
            other => Err(Error::IllegalArgument(format!(
                "storage data must be an object, got {}",
                kind_of(&other)
            ))),
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 경로의 값 조회
    pub fn get(&self, path: &str) -> Option<Value> {
        let inner = self.inner.read();
        get_path(&inner.data, path).cloned()
    }

    /// 경로의 값 조회 (기본값)
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).unwrap_or(default)
    }

    /// 경로 존재 여부
    pub fn contains(&self, path: &str) -> bool {
        let inner = self.inner.read();
        get_path(&inner.data, path).is_some()
    }

    /// 전체 데이터 복사본
    pub fn snapshot(&self) -> Value {
        self.inner.read().data.clone()
    }

    /// 모든 경로 나열
    pub fn list(&self, exclude_containers: bool) -> BTreeMap<String, Value> {
        let inner = self.inner.read();
        list_paths(&inner.data, exclude_containers)
    }

    // ========================================================================
    // 쓰기
    // ========================================================================

    /// 경로에 값 쓰기
    pub fn set(&self, path: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.write();
        let root = path.split('.').next().unwrap_or_default();
        if inner.readonly.contains(root) {
            return Err(Error::IllegalArgument(format!("'{}' is read only", root)));
        }
        set_path(&mut inner.data, path, value)
    }

    /// 읽기 전용 최상위 값 바인딩
    pub fn con(&self, name: &str, value: Value) -> Result<()> {
        if name.is_empty() || name.contains('.') {
            return Err(Error::IllegalArgument(format!(
                "read only binding requires a top-level name, got '{}'",
                name
            )));
        }

        let mut inner = self.inner.write();
        if inner.readonly.contains(name) {
            return Err(Error::IllegalArgument(format!("'{}' is read only", name)));
        }
        set_path(&mut inner.data, name, value)?;
        inner.readonly.insert(name.to_string());
        Ok(())
    }

    /// 데이터 교체 (읽기 전용 바인딩은 유지)
    pub fn replace(&self, data: Value) -> Result<()> {
        let mut map = match data {
            Value::Object(map) => map,
            other => {
                return Err(Error::IllegalArgument(format!(
                    "storage data must be an object, got {}",
                    kind_of(&other)
                )))
            }
        };

        let mut inner = self.inner.write();
        let bound: Vec<(String, Value)> = inner
            .readonly
            .iter()
            .filter_map(|key| {
                get_path(&inner.data, key).map(|value| (key.clone(), value.clone()))
            })
            .collect();
        for (key, value) in bound {
            map.insert(key, value);
        }
        inner.data = Value::Object(map);
        Ok(())
    }

    /// 재귀 병합
    pub fn merge(&self, other: &Value) -> Result<()> {
        let mut inner = self.inner.write();
        if let Value::Object(incoming) = other {
            if let Some(key) = incoming.keys().find(|k| inner.readonly.contains(*k)) {
                return Err(Error::IllegalArgument(format!("'{}' is read only", key)));
            }
        }
        merge_value(&mut inner.data, other)
    }

    /// 다른 저장소의 데이터를 병합
    pub fn merge_storage(&self, other: &Storage) -> Result<()> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        let data = other.snapshot();
        self.merge(&data)
    }

    /// 같은 데이터를 가리키는지 확인
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("data", &self.inner.read().data)
            .finish()
    }
}

impl TryFrom<Value> for Storage {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Storage::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_get_set() {
        let storage = Storage::new();
        storage.set("server.port", json!(8080)).unwrap();

        assert_eq!(storage.get("server.port"), Some(json!(8080)));
        assert_eq!(storage.get_or("server.host", json!("localhost")), json!("localhost"));
        assert!(storage.contains("server"));
    }

    #[test]
    fn test_storage_shared_handle() {
        let storage = Storage::new();
        let other = storage.clone();
        other.set("files", json!(["a.rs"])).unwrap();

        assert_eq!(storage.get("files.0"), Some(json!("a.rs")));
        assert!(storage.ptr_eq(&other));
        assert!(!storage.ptr_eq(&Storage::new()));
    }

    #[test]
    fn test_storage_readonly() {
        let storage = Storage::new();
        storage.con("app", json!({ "name": "stater" })).unwrap();

        assert!(storage.set("app.name", json!("other")).is_err());
        assert!(storage.merge(&json!({ "app": 1 })).is_err());
        assert!(storage.con("app", json!(1)).is_err());

        storage.replace(json!({ "x": 1 })).unwrap();
        assert_eq!(storage.get("app.name"), Some(json!("stater")));
        assert_eq!(storage.get("x"), Some(json!(1)));
    }

    #[test]
    fn test_storage_from_value() {
        assert!(Storage::from_value(json!([1, 2])).is_err());

        let storage = Storage::from_value(json!({ "a": { "b": 1 } })).unwrap();
        let listed = storage.list(true);
        assert_eq!(listed.get("a.b"), Some(&json!(1)));
    }

    #[test]
    fn test_storage_merge() {
        let storage = Storage::from_value(json!({ "db": { "host": "a", "port": 1 } })).unwrap();
        let other = Storage::from_value(json!({ "db": { "port": 2 } })).unwrap();
        storage.merge_storage(&other).unwrap();

        assert_eq!(storage.snapshot(), json!({ "db": { "host": "a", "port": 2 } }));
        assert!(matches!(
            storage.merge(&json!("text")),
            Err(Error::IllegalMerge(_))
        ));
    }
}
