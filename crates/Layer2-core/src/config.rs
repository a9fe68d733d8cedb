//! Config - 버전이 있는 설정 데이터
//!
//! 서비스는 초기화 시 `<name>-config@~<version>` 또는 지정한 선택자로
//! 자신의 설정을 찾습니다.

use crate::registry::{Definition, Entity, VersionedRegistry};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use stater_foundation::{kind_of, Error, Result, Storage};
use std::collections::BTreeMap;
use std::fmt;

/// 설정 저장소
pub type ConfigStore = VersionedRegistry<Config>;

/// 설정 생성 함수 (공유 클래스로 노출)
pub type ConfigClass = fn(&str, ConfigDefinition) -> Result<Config>;

// ============================================================================
// ConfigDefinition
// ============================================================================

/// 설정 정의
#[derive(Debug, Clone, Default)]
pub struct ConfigDefinition {
    pub version: Option<String>,
    pub data: Value,
    pub include: Vec<String>,
    pub attributes: Map<String, Value>,
}

impl ConfigDefinition {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
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

impl Definition for ConfigDefinition {
    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

// ============================================================================
// Config
// ============================================================================

/// 설정 엔티티
pub struct Config {
    name: String,
    version: String,
    data: Storage,
    attributes: RwLock<Map<String, Value>>,
}

impl Config {
    /// 설정 생성 (data는 객체이거나 비어 있어야 함)
    pub fn new(name: &str, definition: ConfigDefinition) -> Result<Self> {
        let version = definition
            .version
            .clone()
            .unwrap_or_else(|| stater_foundation::DEFAULT_VERSION.to_string());
        Self::create(name, &version, definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 설정 데이터 (공유 핸들)
    pub fn data(&self) -> &Storage {
        &self.data
    }

    /// 경로의 값 조회
    pub fn get(&self, path: &str) -> Option<Value> {
        self.data.get(path)
    }

    pub fn snapshot(&self) -> Value {
        self.data.snapshot()
    }

    /// 모든 경로 나열
    pub fn list(&self, exclude_containers: bool) -> BTreeMap<String, Value> {
        self.data.list(exclude_containers)
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.attributes.read().clone()
    }
}

fn data_object(name: &str, data: Value) -> Result<Value> {
    match data {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(data),
        other => Err(Error::IllegalArgument(format!(
            "config {} data must be an object, got {}",
            name,
            kind_of(&other)
        ))),
    }
}

impl Entity for Config {
    type Definition = ConfigDefinition;
    type Projection = Value;

    fn create(name: &str, version: &str, definition: ConfigDefinition) -> Result<Self> {
        let data = Storage::from_value(data_object(name, definition.data)?)?;
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            data,
            attributes: RwLock::new(definition.attributes),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn merge(&self, definition: ConfigDefinition) -> Result<()> {
        if !definition.data.is_null() {
            self.data.merge(&definition.data)?;
        }
        self.attributes.write().extend(definition.attributes);
        Ok(())
    }

    fn project(&self, path: &str) -> Option<Value> {
        self.get(path)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("data", &self.data.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Lookup;
    use serde_json::json;

    #[test]
    fn test_config_store_add_and_get() {
        let store = ConfigStore::new("configs");
        store
            .add(
                "http-config",
                ConfigDefinition::new(json!({ "port": 8080, "tls": { "enabled": false } }))
                    .version("1.2.0"),
            )
            .unwrap();

        let config = store.get_entity("http-config@~1.2.0").unwrap();
        assert_eq!(config.get("port"), Some(json!(8080)));

        let port = store.get("http-config/tls/enabled").unwrap();
        assert!(matches!(port, Lookup::Projection(ref v) if v == &json!(false)));
    }

    #[test]
    fn test_config_merge() {
        let store = ConfigStore::new("configs");
        let first = store
            .add(
                "db",
                ConfigDefinition::new(json!({ "host": "a", "pool": { "min": 1 } }))
                    .attr("owner", json!("ops")),
            )
            .unwrap();
        store
            .add(
                "db",
                ConfigDefinition::new(json!({ "pool": { "max": 8 } })).version("1.0.0"),
            )
            .unwrap();

        assert_eq!(
            first.snapshot(),
            json!({ "host": "a", "pool": { "min": 1, "max": 8 } })
        );
        assert_eq!(first.attribute("owner"), Some(json!("ops")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_config_data_must_be_object() {
        assert!(Config::new("bad", ConfigDefinition::new(json!([1, 2]))).is_err());

        let empty = Config::new("empty", ConfigDefinition::default()).unwrap();
        assert_eq!(empty.version(), "1.0.0");
        assert_eq!(empty.snapshot(), json!({}));
    }

    #[test]
    fn test_config_merge_incompatible() {
        let store = ConfigStore::new("configs");
        store.add("x", ConfigDefinition::new(json!({ "a": 1 }))).unwrap();

        let result = store.add("x", ConfigDefinition::new(json!(["no"])));
        assert!(matches!(result, Err(Error::IllegalMerge(_))));
    }
}
