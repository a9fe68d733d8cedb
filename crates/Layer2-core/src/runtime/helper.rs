//! Helpers - `helper` 이름으로 주입되는 기본 유틸리티와 클래스

use crate::config::{Config, ConfigClass};
use crate::resolver::MapScope;
use serde_json::Value;
use stater_foundation::{
    get_path, list_paths, merge_value, set_path, version, Logger, Result, Storage,
    VersionRequest,
};
use std::collections::BTreeMap;

/// 값으로 Storage를 만드는 함수 (공유 클래스 `Storage`)
pub type StorageClass = fn(Value) -> Result<Storage>;

/// 버전 요청 분해와 semver 매칭
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionHelper;

impl VersionHelper {
    pub fn split(&self, request: &str) -> VersionRequest {
        version::split(request)
    }

    pub fn matching(&self, versions: &[&str], constraint: &str) -> Option<String> {
        version::matching(versions.iter().copied(), constraint)
    }

    pub fn latest(&self, versions: &[&str]) -> Option<String> {
        version::latest(versions.iter().copied())
    }

    pub fn greater_than(&self, a: &str, b: &str) -> Option<bool> {
        version::greater_than(a, b)
    }
}

/// JSON 경로 조작
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHelper;

impl ObjectHelper {
    pub fn get(&self, target: &Value, path: &str) -> Option<Value> {
        get_path(target, path).cloned()
    }

    pub fn set(&self, target: &mut Value, path: &str, value: Value) -> Result<()> {
        set_path(target, path, value)
    }

    pub fn list(&self, target: &Value, exclude_containers: bool) -> BTreeMap<String, Value> {
        list_paths(target, exclude_containers)
    }

    pub fn merge(&self, target: &mut Value, source: &Value) -> Result<()> {
        merge_value(target, source)
    }
}

pub(crate) fn default_helpers() -> MapScope {
    MapScope::new()
        .with("version", VersionHelper)
        .with("object", ObjectHelper)
        .with("logger", Logger::new("helper"))
}

pub(crate) fn default_classes() -> MapScope {
    let storage: StorageClass = Storage::from_value;
    let config: ConfigClass = Config::new;
    MapScope::new().with("Storage", storage).with("Config", config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_helper() {
        let helper = VersionHelper;
        let versions = ["1.0.0", "1.2.3", "2.0.0"];

        assert_eq!(helper.matching(&versions, "^1.0.0").as_deref(), Some("1.2.3"));
        assert_eq!(helper.latest(&versions).as_deref(), Some("2.0.0"));
        assert_eq!(helper.latest(&[]), None);
        assert_eq!(helper.split("db@~1.0.0/pool").name, "db");
    }

    #[test]
    fn test_object_helper() {
        let helper = ObjectHelper;
        let mut target = json!({ "a": { "b": 1 } });

        helper.set(&mut target, "a.c", json!(2)).unwrap();
        helper.merge(&mut target, &json!({ "d": 3 })).unwrap();

        assert_eq!(helper.get(&target, "a.c"), Some(json!(2)));
        assert_eq!(helper.list(&target, true).len(), 3);
    }

    #[test]
    fn test_helper_scope_lookup() {
        let helpers = default_helpers();
        let scope: &dyn crate::resolver::Scope = &helpers;
        let version = scope.lookup("version").unwrap();
        assert!(version.downcast_ref::<VersionHelper>().is_some());
    }
}
