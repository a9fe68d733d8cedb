//! 설정 파일 위치 - 글로벌/프로젝트 레이어

use super::{PartialConfig, STATER_CONFIG_FILE};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 설정 디렉토리 이름
pub const CONFIG_DIR_NAME: &str = "stater";

/// 설정 레이어 (뒤의 레이어가 앞의 값을 덮어씀)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Global,
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::Global => write!(f, "global"),
            ConfigLayer::Project => write!(f, "project"),
        }
    }
}

/// 읽기 전용 설정 파일 하나
#[derive(Debug, Clone)]
pub struct ConfigSource {
    layer: ConfigLayer,
    path: PathBuf,
}

impl ConfigSource {
    /// `dir/config.json`을 프로젝트 레이어로 사용
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            layer: ConfigLayer::Project,
            path: dir.as_ref().join(STATER_CONFIG_FILE),
        }
    }

    /// `<config_dir>/stater/config.json`
    pub fn global() -> Option<Self> {
        let dir = dirs::config_dir()?.join(CONFIG_DIR_NAME);
        Some(Self {
            layer: ConfigLayer::Global,
            path: dir.join(STATER_CONFIG_FILE),
        })
    }

    /// `<root>/.stater/config.json`
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(format!(".{}", CONFIG_DIR_NAME)))
    }

    /// 병합 순서대로 정렬된 레이어 (글로벌, 현재 디렉토리 프로젝트)
    ///
    /// 위치를 알 수 없는 레이어는 빠집니다.
    pub fn layers() -> Vec<Self> {
        let mut layers = Vec::with_capacity(2);
        match Self::global() {
            Some(global) => layers.push(global),
            None => debug!("[config] No global config directory"),
        }
        match std::env::current_dir() {
            Ok(cwd) => layers.push(Self::project(cwd)),
            Err(e) => debug!("[config] No current directory: {}", e),
        }
        layers
    }

    pub fn layer(&self) -> ConfigLayer {
        self.layer
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일이 없으면 None, 읽기/파싱 실패는 `Error::Config`
    pub(super) fn read(&self) -> Result<Option<PartialConfig>> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Config(format!(
                "Failed to read {} config {}: {}",
                self.layer,
                self.path.display(),
                e
            ))
        })?;
        let partial = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Invalid {} config {}: {}",
                self.layer,
                self.path.display(),
                e
            ))
        })?;

        debug!("[config] Loaded {} config from {}", self.layer, self.path.display());
        Ok(Some(partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigSource::at(dir.path()).read().unwrap().is_none());
    }

    #[test]
    fn test_read_invalid_json_names_layer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATER_CONFIG_FILE), "{ nope").unwrap();

        match ConfigSource::at(dir.path()).read() {
            Err(Error::Config(message)) => assert!(message.contains("project config")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_project_path() {
        let source = ConfigSource::project("/tmp/app");
        assert_eq!(source.layer(), ConfigLayer::Project);
        assert_eq!(source.path(), Path::new("/tmp/app/.stater/config.json"));
    }

    #[test]
    fn test_layers_end_with_project() {
        let layers = ConfigSource::layers();
        assert_eq!(layers.last().map(ConfigSource::layer), Some(ConfigLayer::Project));
    }
}
