//! # stater-foundation
//!
//! Foundation layer for Stater:
//! - Error: 공통 에러 타입
//! - Storage: 서비스들이 공유하는 이름 기반 데이터 컨테이너
//! - Version: 요청 문자열 분해 및 semver 매칭
//! - Config: 런타임 설정 (글로벌 + 프로젝트 + 환경 변수)
//! - Logging: tracing 초기화와 주입용 Logger
//!
//! ## 아키텍처
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  stater-core (Registry, Resolver, Service,   │
//! │               Context, Stater runtime)        │
//! │                     │                         │
//! │                     ▼                         │
//! │  stater-foundation                            │
//! │  ├── Storage (get/set/list/merge)             │
//! │  ├── Version (split/matching/latest)          │
//! │  └── Config + Logging                         │
//! └───────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod version;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ConfigSource, RunMode, RuntimeConfig, LOG_ENV, STATER_CONFIG_FILE};

// ============================================================================
// Logging
// ============================================================================
pub use logging::Logger;

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{get_path, kind_of, list_paths, merge_value, set_path, Storage};

// ============================================================================
// Version (버전 매칭)
// ============================================================================
pub use version::{split as split_request, VersionRequest, DEFAULT_VERSION};
