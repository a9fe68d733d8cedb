//! Loader - 정의 파일(JSON/TOML)과 모듈 객체에서 서비스/설정 등록
//!
//! ```json
//! {
//!   "service": { "name": "app", "version": "1.0.0", "services": ["db", "http"] },
//!   "config":  { "name": "app-config", "data": { "port": 8080 } },
//!   "include": "./services/*.json"
//! }
//! ```
//!
//! `include`는 정의 파일 기준의 glob 패턴이며, 이미 읽은 파일은 다시 읽지 않습니다.

use super::{Stater, StaterStatus};
use crate::config::ConfigDefinition;
use crate::service::{ServiceDefinition, ServiceUnit, Units};
use serde::Deserialize;
use serde_json::{Map, Value};
use stater_foundation::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Module
// ============================================================================

/// 코드로 만든 정의 묶음
#[derive(Debug, Clone, Default)]
pub struct Module {
    location: Option<PathBuf>,
    services: Vec<(String, ServiceDefinition)>,
    configs: Vec<(String, ConfigDefinition)>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// include 패턴의 기준 디렉토리
    pub fn location(mut self, dir: impl Into<PathBuf>) -> Self {
        self.location = Some(dir.into());
        self
    }

    pub fn service(mut self, name: impl Into<String>, definition: ServiceDefinition) -> Self {
        self.services.push((name.into(), definition));
        self
    }

    pub fn config(mut self, name: impl Into<String>, definition: ConfigDefinition) -> Self {
        self.configs.push((name.into(), definition));
        self
    }
}

// ============================================================================
// Definition files
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    service: OneOrMany<ServiceFile>,
    #[serde(default)]
    config: OneOrMany<ConfigFile>,
    #[serde(default)]
    include: OneOrMany<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    services: Option<OneOrMany<String>>,
    #[serde(default)]
    configs: Option<String>,
    #[serde(default)]
    include: OneOrMany<String>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl ServiceFile {
    fn into_definition(self) -> (String, ServiceDefinition) {
        let units = self.services.map(|services| match services {
            OneOrMany::One(name) => Units::Single(ServiceUnit::Named(name)),
            OneOrMany::Many(names) => {
                Units::Many(names.into_iter().map(ServiceUnit::Named).collect())
            }
        });

        let definition = ServiceDefinition {
            version: self.version,
            units,
            configs: self.configs,
            include: self.include.into_vec(),
            attributes: self.attributes,
        };
        (self.name, definition)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, alias = "configs")]
    data: Value,
    #[serde(default)]
    include: OneOrMany<String>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl ConfigFile {
    fn into_definition(self) -> (String, ConfigDefinition) {
        let definition = ConfigDefinition {
            version: self.version,
            data: self.data,
            include: self.include.into_vec(),
            attributes: self.attributes,
        };
        (self.name, definition)
    }
}

impl DefinitionFile {
    /// 확장자로 형식 결정 (지원하지 않는 형식은 None)
    fn read(path: &Path) -> Result<Option<Self>> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parsed: std::result::Result<Self, String> = match extension.as_deref() {
            Some("json") => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content).map_err(|e| e.to_string())
            }
            Some("toml") => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content).map_err(|e| e.to_string())
            }
            _ => {
                warn!("[loader] Unsupported definition file: {}", path.display());
                return Ok(None);
            }
        };

        parsed
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// 기준 디렉토리에 대한 패턴 (`./` 접두사 제거)
fn resolve_pattern(pattern: &str, base: Option<&Path>) -> String {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    match base {
        Some(dir) if !Path::new(trimmed).is_absolute() => {
            dir.join(trimmed).to_string_lossy().into_owned()
        }
        _ => trimmed.to_string(),
    }
}

// ============================================================================
// Stater loading
// ============================================================================

impl Stater {
    /// glob 패턴에 맞는 정의 파일을 모두 읽고 bootstrapped로 전환
    ///
    /// 읽은 파일 수(include 포함)를 반환합니다.
    pub fn bootstrap(&self, pattern: &str) -> Result<usize> {
        let mut visited = HashSet::new();
        let loaded = self.load_pattern(pattern, None, &mut visited)?;
        self.set_status(StaterStatus::Bootstrapped);
        info!("[stater] Bootstrapped {} definition files", loaded);
        Ok(loaded)
    }

    /// 정의 파일 추가 로드 (상태는 바꾸지 않음)
    pub fn include(&self, pattern: &str) -> Result<usize> {
        let mut visited = HashSet::new();
        self.load_pattern(pattern, None, &mut visited)
    }

    /// 모듈 객체 등록
    ///
    /// 정의의 include 패턴은 모듈 위치 기준으로 읽습니다.
    pub fn load_module(&self, module: Module) -> Result<usize> {
        let mut visited = HashSet::new();
        let base = module.location.as_deref();
        let mut loaded = 0;

        for (name, definition) in module.configs {
            let include = definition.include.clone();
            self.add_config(&name, definition)?;
            for pattern in &include {
                loaded += self.load_pattern(pattern, base, &mut visited)?;
            }
        }
        for (name, definition) in module.services {
            let include = definition.include.clone();
            self.add_service(&name, definition)?;
            for pattern in &include {
                loaded += self.load_pattern(pattern, base, &mut visited)?;
            }
        }

        debug!("[loader] Module loaded ({} included files)", loaded);
        Ok(loaded)
    }

    fn load_pattern(
        &self,
        pattern: &str,
        base: Option<&Path>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<usize> {
        let full = resolve_pattern(pattern, base);
        let paths = glob::glob(&full).map_err(|e| Error::Glob(format!("{}: {}", full, e)))?;

        let mut loaded = 0;
        for entry in paths {
            let path = entry.map_err(|e| Error::Glob(e.to_string()))?;
            if path.is_file() {
                loaded += self.load_file(&path, visited)?;
            }
        }

        if loaded == 0 {
            debug!("[loader] No new definition files for {}", full);
        }
        Ok(loaded)
    }

    fn load_file(&self, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<usize> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(key) {
            debug!("[loader] Already loaded: {}", path.display());
            return Ok(0);
        }

        let Some(file) = DefinitionFile::read(path)? else {
            return Ok(0);
        };
        debug!("[loader] Loading {}", path.display());

        let base = path.parent();
        let mut loaded = 1;

        for config in file.config.into_vec() {
            let (name, definition) = config.into_definition();
            let include = definition.include.clone();
            self.add_config(&name, definition)?;
            for pattern in &include {
                loaded += self.load_pattern(pattern, base, visited)?;
            }
        }
        for service in file.service.into_vec() {
            let (name, definition) = service.into_definition();
            let include = definition.include.clone();
            self.add_service(&name, definition)?;
            for pattern in &include {
                loaded += self.load_pattern(pattern, base, visited)?;
            }
        }
        for pattern in file.include.into_vec() {
            loaded += self.load_pattern(&pattern, base, visited)?;
        }

        Ok(loaded)
    }
}
