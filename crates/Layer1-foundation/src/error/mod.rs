//! Error types for Stater
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stater 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 레지스트리 / 컨테이너 관련
    // ========================================================================
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Illegal merge: {0}")]
    IllegalMerge(String),

    // ========================================================================
    // 서비스 초기화 관련
    // ========================================================================
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid handler: {handler} from {service} is not a function")]
    InvalidHandler { service: String, handler: String },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Illegal start: service {0} must be initialized before it can be started")]
    IllegalStart(String),

    #[error("Service failed: {service} - {message}")]
    Service { service: String, message: String },

    // ========================================================================
    // 설정 / 정의 로딩 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Glob error: {0}")]
    Glob(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 초기화 단계에서 보고만 하고 계속 진행하는 에러인지 확인
    pub fn is_init_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingDependency(_) | Error::InvalidHandler { .. }
        )
    }

    /// 서비스 실행 에러 생성 헬퍼
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Handler 에러 생성 헬퍼
    pub fn invalid_handler(service: impl Into<String>, handler: impl Into<String>) -> Self {
        Error::InvalidHandler {
            service: service.into(),
            handler: handler.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_handler("http", "listen");
        assert_eq!(
            err.to_string(),
            "Invalid handler: listen from http is not a function"
        );

        let err = Error::IllegalStart("http".to_string());
        assert!(err.to_string().contains("must be initialized"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::MissingDependency("x".into()).is_init_recoverable());
        assert!(!Error::IllegalStart("x".into()).is_init_recoverable());
    }

    #[test]
    fn test_from_anyhow() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Internal(ref m) if m == "boom"));
    }
}
