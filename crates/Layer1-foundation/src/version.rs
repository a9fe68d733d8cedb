//! Version Matcher - 요청 문자열 분해 및 semver 매칭
//!
//! 요청 문법:
//!
//! ```text
//! http-service                   // 최신 버전, 전체 엔티티
//! http-service@~1.0.0            // 범위에 맞는 가장 높은 버전
//! http-service@1.0.0/listen      // 버전 해석 후 하위 경로(listen) 투영
//! http-service/server/listen     // 최신 버전의 server.listen
//! ```
//!
//! `@` 뒤의 버전 토큰은 `[0-9.~^<>=]` 문자로만 구성됩니다.

use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// 기본 버전
pub const DEFAULT_VERSION: &str = "1.0.0";

static VERSION_TOKEN: OnceLock<Regex> = OnceLock::new();
static VERSION_NUMBER: OnceLock<Regex> = OnceLock::new();

fn version_token() -> &'static Regex {
    VERSION_TOKEN.get_or_init(|| Regex::new(r"@[\d.~><=^]+").expect("valid version token regex"))
}

fn version_number() -> &'static Regex {
    VERSION_NUMBER.get_or_init(|| Regex::new(r"[\d.]+").expect("valid version number regex"))
}

// ============================================================================
// VersionRequest
// ============================================================================

/// 분해된 요청 (이름, 버전 조건, 하위 경로)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    pub name: String,
    pub version: Option<String>,
    pub subpath: Option<String>,
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref version) = self.version {
            write!(f, "@{}", version)?;
        }
        if let Some(ref subpath) = self.subpath {
            write!(f, "/{}", subpath.replace('.', "/"))?;
        }
        Ok(())
    }
}

/// 요청 문자열 분해
pub fn split(request: &str) -> VersionRequest {
    if let Some(token) = version_token().find(request) {
        let name = request[..token.start()].to_string();
        let version = token.as_str().trim_start_matches('@').to_string();

        // 같은 토큰이 다시 나오면 그 앞까지만 하위 경로로 취급
        let rest = &request[token.end()..];
        let rest = match rest.find(token.as_str()) {
            Some(idx) => &rest[..idx],
            None => rest,
        };

        return VersionRequest {
            name,
            version: Some(version),
            subpath: normalize_subpath(rest),
        };
    }

    let mut segments = request.split('/');
    let name = segments.next().unwrap_or_default().to_string();
    let subpath = segments.collect::<Vec<_>>().join(".");

    VersionRequest {
        name,
        version: None,
        subpath: if subpath.is_empty() { None } else { Some(subpath) },
    }
}

fn normalize_subpath(rest: &str) -> Option<String> {
    let path = rest
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

// ============================================================================
// 버전 선택
// ============================================================================

/// 버전 조건 파싱
///
/// 숫자로 시작하는 조건(`1.2.0`)은 정확히 그 버전만 허용합니다 (`=1.2.0`).
pub fn parse_constraint(constraint: &str) -> Option<VersionReq> {
    let constraint = constraint.trim();
    let normalized = if constraint.starts_with(|c: char| c.is_ascii_digit()) {
        format!("={}", constraint)
    } else {
        constraint.to_string()
    };

    match VersionReq::parse(&normalized) {
        Ok(req) => Some(req),
        Err(e) => {
            warn!("Invalid version constraint '{}': {}", constraint, e);
            None
        }
    }
}

fn parse_candidates<'a, I>(versions: I) -> Vec<(Version, &'a str)>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter_map(|raw| match Version::parse(raw) {
            Ok(v) => Some((v, raw)),
            Err(e) => {
                warn!("Skipping malformed version '{}': {}", raw, e);
                None
            }
        })
        .collect()
}

/// 조건을 만족하는 가장 높은 버전 (없으면 None)
pub fn matching<'a, I>(versions: I, constraint: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let req = parse_constraint(constraint)?;

    parse_candidates(versions)
        .into_iter()
        .filter(|(v, _)| req.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.to_string())
}

/// 가장 높은 버전 (빈 집합이면 None)
pub fn latest<'a, I>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    parse_candidates(versions)
        .into_iter()
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.to_string())
}

/// semver로 해석 가능한 버전인지 확인
pub fn is_valid(version: &str) -> bool {
    Version::parse(version).is_ok()
}

/// `a > b` (semver 우선순위). 둘 중 하나라도 잘못된 버전이면 None
pub fn greater_than(a: &str, b: &str) -> Option<bool> {
    let a = Version::parse(a).ok()?;
    let b = Version::parse(b).ok()?;
    Some(a > b)
}

/// 요청 문자열에 버전 조건 문법이 들어있는지 확인
pub fn has_constraint_syntax(version: &str) -> bool {
    version.contains(|c: char| matches!(c, '~' | '^' | '<' | '>' | '='))
}

/// 첫 번째 숫자/점 구간을 구체 버전으로 추출 (`~1.2.0` -> `1.2.0`)
pub fn extract_version(version: &str) -> Option<String> {
    version_number()
        .find(version)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_version_and_subpath() {
        let req = split("babel@~2.0.0/compile/file");
        assert_eq!(req.name, "babel");
        assert_eq!(req.version.as_deref(), Some("~2.0.0"));
        assert_eq!(req.subpath.as_deref(), Some("compile.file"));
    }

    #[test]
    fn test_split_property() {
        for (n, c, p) in [
            ("http", "1.0.0", "listen"),
            ("db-config", "^3.1.0", "pool/size"),
            ("x", ">=0.1.0", "a/b/c"),
        ] {
            let req = split(&format!("{}@{}/{}", n, c, p));
            assert_eq!(req.name, n);
            assert_eq!(req.version.as_deref(), Some(c));
            assert_eq!(req.subpath, Some(p.replace('/', ".")));
        }
    }

    #[test]
    fn test_split_without_version() {
        let req = split("http/server/listen");
        assert_eq!(req.name, "http");
        assert_eq!(req.version, None);
        assert_eq!(req.subpath.as_deref(), Some("server.listen"));

        let req = split("http");
        assert_eq!(req.subpath, None);
        assert_eq!(req.to_string(), "http");
    }

    #[test]
    fn test_latest() {
        assert_eq!(
            latest(["1.0.0", "2.1.0", "1.9.9"]).as_deref(),
            Some("2.1.0")
        );
        assert_eq!(latest(Vec::<&str>::new()), None);
        assert_eq!(latest(["bogus", "0.1.0"]).as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_matching() {
        let versions = ["1.0.0", "1.2.0", "2.0.0"];
        assert_eq!(matching(versions, "~1.0.0").as_deref(), Some("1.0.0"));
        assert_eq!(matching(versions, "^1.0.0").as_deref(), Some("1.2.0"));
        assert_eq!(matching(versions, "^3.0.0"), None);
        assert_eq!(matching(versions, "1.0.0").as_deref(), Some("1.0.0"));
        assert_eq!(matching(versions, ">=1.1.0").as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_version_helpers() {
        assert_eq!(greater_than("2.0.0", "1.9.9"), Some(true));
        assert_eq!(greater_than("x", "1.0.0"), None);
        assert!(is_valid("1.0.0"));
        assert!(!is_valid("1.0"));
        assert!(has_constraint_syntax("~1.0.0"));
        assert!(!has_constraint_syntax("1.0.0"));
        assert_eq!(extract_version("~1.2.0").as_deref(), Some("1.2.0"));
        assert_eq!(extract_version("latest"), None);
    }
}
