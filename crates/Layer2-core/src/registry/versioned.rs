//! Versioned Registry - 이름 -> (버전 -> 엔티티) 저장소

use super::traits::{Definition, Entity, Lookup};
use parking_lot::RwLock;
use stater_foundation::version::{self, DEFAULT_VERSION};
use stater_foundation::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

type Bucket<E> = BTreeMap<String, Arc<E>>;

/// 버전 레지스트리
///
/// 같은 (name, version) 슬롯에는 항상 하나의 엔티티만 존재합니다.
/// 다시 추가하면 교체하지 않고 기존 엔티티에 병합합니다. 항목은 삭제되지 않습니다.
pub struct VersionedRegistry<E: Entity> {
    /// 레지스트리 이름 (디버깅용)
    name: String,

    /// 버전이 없는 정의의 기본 버전
    default_version: String,

    entries: RwLock<HashMap<String, Bucket<E>>>,
}

impl<E: Entity> VersionedRegistry<E> {
    /// 새 레지스트리 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_default_version(name, DEFAULT_VERSION)
    }

    pub fn with_default_version(name: impl Into<String>, default_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_version: default_version.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 항목 추가 (없으면 생성, 있으면 병합)
    ///
    /// 1. 정의의 버전이 기존 항목과 매칭되면(`name@version`) 그 항목에 병합
    /// 2. 아니면 버전 문자열의 첫 숫자 구간을 구체 버전으로 사용 (기본 `1.0.0`)
    /// 3. 슬롯이 비어 있으면 생성, 차 있으면 병합
    pub fn add(&self, name: &str, definition: E::Definition) -> Result<Arc<E>> {
        validate_name(name)?;

        let requested = definition.version().map(str::to_string);

        if let Some(ref requested) = requested {
            if let Some(Lookup::Entity(existing)) = self.get(&format!("{}@{}", name, requested)) {
                existing.merge(definition)?;
                debug!(
                    "[{}] Merged: {}@{} (requested {})",
                    self.name,
                    name,
                    existing.version(),
                    requested
                );
                return Ok(existing);
            }
        }

        let version = match requested {
            Some(ref requested) => self.concrete_version(name, requested),
            None => self.default_version.clone(),
        };

        let mut entries = self.entries.write();
        let bucket = entries.entry(name.to_string()).or_default();

        if let Some(existing) = bucket.get(&version) {
            let existing = Arc::clone(existing);
            drop(entries);
            existing.merge(definition)?;
            debug!("[{}] Merged: {}@{}", self.name, name, version);
            return Ok(existing);
        }

        let entity = Arc::new(E::create(name, &version, definition)?);
        bucket.insert(version.clone(), Arc::clone(&entity));
        debug!("[{}] Registered: {}@{}", self.name, name, version);

        Ok(entity)
    }

    fn concrete_version(&self, name: &str, requested: &str) -> String {
        let extracted = version::extract_version(requested);

        if version::has_constraint_syntax(requested) {
            warn!(
                "[{}] Version '{}' of {} matched nothing, registering it as {}",
                self.name,
                requested,
                name,
                extracted.as_deref().unwrap_or(&self.default_version)
            );
        }

        match extracted {
            Some(v) => {
                if !version::is_valid(&v) {
                    warn!(
                        "[{}] '{}' of {} is not a valid semantic version, matching is undefined",
                        self.name, v, name
                    );
                }
                v
            }
            None => self.default_version.clone(),
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 요청 문자열로 조회 (`name`, `name@range`, `name@range/sub/path`)
    pub fn get(&self, request: &str) -> Option<Lookup<E>> {
        let req = version::split(request);

        let entity = {
            let entries = self.entries.read();
            let bucket = entries.get(&req.name)?;
            let keys = bucket.keys().map(String::as_str);

            let chosen = match req.version {
                Some(ref constraint) => version::matching(keys, constraint),
                None => version::latest(keys),
            }?;

            Arc::clone(bucket.get(&chosen)?)
        };

        match req.subpath {
            Some(ref path) => {
                debug!("[{}] Found: {}@{}/{}", self.name, entity.name(), entity.version(), path);
                entity.project(path).map(Lookup::Projection)
            }
            None => {
                debug!("[{}] Found: {}@{}", self.name, entity.name(), entity.version());
                Some(Lookup::Entity(entity))
            }
        }
    }

    /// 전체 엔티티만 조회
    pub fn get_entity(&self, request: &str) -> Option<Arc<E>> {
        self.get(request).and_then(Lookup::entity)
    }

    /// 등록된 이름 목록 (정렬됨)
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 이름에 등록된 버전 목록
    pub fn versions(&self, name: &str) -> Vec<String> {
        self.entries
            .read()
            .get(name)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 모든 엔티티 (이름, 버전 순)
    pub fn entities(&self) -> Vec<Arc<E>> {
        let entries = self.entries.read();
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        names
            .into_iter()
            .flat_map(|name| entries[name].values().cloned())
            .collect()
    }

    /// 엔티티 수 (모든 버전 포함)
    pub fn len(&self) -> usize {
        self.entries.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::IllegalArgument("name must not be empty".to_string()));
    }
    if name.contains('@') || name.contains('/') {
        return Err(Error::IllegalArgument(format!(
            "name '{}' must not contain '@' or '/'",
            name
        )));
    }
    Ok(())
}
