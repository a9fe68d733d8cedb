//! Runtime Config - Stater 런타임 설정
//!
//! 글로벌 설정 위에 프로젝트 설정을 병합하고, 마지막으로 환경 변수를 적용합니다.
//!
//! ```text
//! <config_dir>/stater/config.json   (글로벌)
//! ./.stater/config.json             (프로젝트, 우선)
//! STATER_LOG                        (log_level 덮어쓰기)
//! ```

mod source;

pub use source::{ConfigLayer, ConfigSource, CONFIG_DIR_NAME};

use crate::version::DEFAULT_VERSION;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 설정 파일명
pub const STATER_CONFIG_FILE: &str = "config.json";

/// 로그 레벨 환경 변수
pub const LOG_ENV: &str = "STATER_LOG";

// ============================================================================
// RunMode
// ============================================================================

/// 서비스 실행 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 모든 서비스를 기다리지 않고 순서대로 시작
    #[default]
    Async,
    /// 이전 서비스가 끝나야 다음 서비스 시작
    Sync,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Async => write!(f, "async"),
            RunMode::Sync => write!(f, "sync"),
        }
    }
}

impl FromStr for RunMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "async" => Ok(RunMode::Async),
            "sync" => Ok(RunMode::Sync),
            other => Err(crate::Error::IllegalArgument(format!(
                "unknown run mode: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// RuntimeConfig
// ============================================================================

/// Stater 런타임 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 로그 레벨 (EnvFilter 문법)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 디버그 모드 (log_level을 debug로 올림)
    #[serde(default)]
    pub debug: bool,

    /// 모드를 지정하지 않은 start의 기본 실행 모드
    #[serde(default)]
    pub default_mode: RunMode,

    /// 서비스 기본 설정 이름 접미사 (`<service>-config`)
    #[serde(default = "default_config_suffix")]
    pub config_suffix: String,

    /// 버전이 없는 엔티티의 기본 버전
    #[serde(default = "default_version")]
    pub default_version: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_config_suffix() -> String {
    "-config".to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            debug: false,
            default_mode: RunMode::default(),
            config_suffix: default_config_suffix(),
            default_version: default_version(),
        }
    }
}

/// 파일에서 읽는 부분 설정 (지정된 필드만 병합)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    log_level: Option<String>,
    debug: Option<bool>,
    default_mode: Option<RunMode>,
    config_suffix: Option<String>,
    default_version: Option<String>,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();
        for source in ConfigSource::layers() {
            config.merge_from(&source)?;
        }
        config.apply_env();
        Ok(config)
    }

    /// 파일 하나만 로드 (환경 변수 미적용)
    pub fn load_from(source: &ConfigSource) -> Result<Self> {
        let mut config = Self::new();
        config.merge_from(source)?;
        Ok(config)
    }

    fn merge_from(&mut self, source: &ConfigSource) -> Result<()> {
        if let Some(partial) = source.read()? {
            self.merge(partial);
        }
        Ok(())
    }

    fn merge(&mut self, other: PartialConfig) {
        if let Some(level) = other.log_level {
            self.log_level = level;
        }
        if let Some(debug) = other.debug {
            self.debug = debug;
        }
        if let Some(mode) = other.default_mode {
            self.default_mode = mode;
        }
        if let Some(suffix) = other.config_suffix {
            self.config_suffix = suffix;
        }
        if let Some(version) = other.default_version {
            self.default_version = version;
        }
    }

    /// STATER_LOG 환경 변수 적용
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                self.log_level = level;
            }
        }
    }

    /// 실제로 적용할 필터 문자열
    pub fn effective_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// 서비스의 기본 설정 선택자 (`<name>-config@~<version>`)
    pub fn config_selector(&self, service: &str, version: &str) -> String {
        format!("{}{}@~{}", service, self.config_suffix, version)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn default_mode(mut self, mode: RunMode) -> Self {
        self.default_mode = mode;
        self
    }
}
