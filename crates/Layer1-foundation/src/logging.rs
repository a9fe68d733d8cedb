//! Logging - tracing 구독자 초기화 및 주입용 Logger 핸들

use crate::config::RuntimeConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 전역 tracing 구독자 설치
///
/// 환경 변수(`RUST_LOG`)가 있으면 그 필터를, 없으면 설정의 레벨을 사용합니다.
/// 이미 설치되어 있으면 아무것도 하지 않습니다.
pub fn init(config: &RuntimeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.effective_level()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

// ============================================================================
// Logger
// ============================================================================

/// 서비스에 주입되는 로거
///
/// prefix는 `init`, `exec:<context id>` 또는 함수 이름입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    prefix: String,
}

impl Logger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 하위 prefix를 가진 로거 (`exec:1/http`)
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}/{}", self.prefix, name))
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(prefix = %self.prefix, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(prefix = %self.prefix, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(prefix = %self.prefix, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(prefix = %self.prefix, "{}", message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_prefix() {
        let logger = Logger::new("exec:42");
        assert_eq!(logger.prefix(), "exec:42");
        assert_eq!(logger.child("http").prefix(), "exec:42/http");
        logger.info("started");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = RuntimeConfig::default();
        init(&config);
        init(&config);
    }
}
