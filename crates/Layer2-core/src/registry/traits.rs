//! Registry Traits - 버전 레지스트리에 등록 가능한 엔티티 인터페이스

use crate::resolver::Dependency;
use stater_foundation::Result;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Definition - 등록/병합 입력
// ============================================================================

/// `add`에 전달되는 정의 (버전 + 병합할 속성)
pub trait Definition {
    /// 요청된 버전 문자열 (구체 버전 또는 조건)
    fn version(&self) -> Option<&str>;
}

// ============================================================================
// Entity - 레지스트리 항목
// ============================================================================

/// 레지스트리 항목이 구현해야 하는 trait
///
/// 항목은 `Arc`로 공유되므로 병합은 내부 가변성으로 처리합니다.
pub trait Entity: Send + Sync + Sized + 'static {
    type Definition: Definition;
    type Projection: Clone + Send + Sync + 'static;

    /// 새 항목 생성
    fn create(name: &str, version: &str, definition: Self::Definition) -> Result<Self>;

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// 같은 (name, version) 슬롯에 다시 추가될 때 병합
    fn merge(&self, definition: Self::Definition) -> Result<()>;

    /// 하위 경로 투영 (`name/a/b` 요청)
    fn project(&self, path: &str) -> Option<Self::Projection>;
}

// ============================================================================
// Lookup - 조회 결과
// ============================================================================

/// 레지스트리 조회 결과: 전체 엔티티 또는 하위 경로 값
pub enum Lookup<E: Entity> {
    Entity(Arc<E>),
    Projection(E::Projection),
}

impl<E: Entity> Lookup<E> {
    /// 전체 엔티티 (투영이면 None)
    pub fn entity(self) -> Option<Arc<E>> {
        match self {
            Lookup::Entity(entity) => Some(entity),
            Lookup::Projection(_) => None,
        }
    }

    /// 투영 값 (엔티티면 None)
    pub fn projection(self) -> Option<E::Projection> {
        match self {
            Lookup::Entity(_) => None,
            Lookup::Projection(value) => Some(value),
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Lookup::Entity(_))
    }

    /// 주입 가능한 값으로 변환
    ///
    /// 엔티티는 `Arc<E>` 그대로, 투영은 새 `Arc`로 감쌉니다.
    pub fn into_dependency(self) -> Dependency
    where
        E::Projection: Any,
    {
        match self {
            Lookup::Entity(entity) => entity as Dependency,
            Lookup::Projection(value) => Arc::new(value) as Dependency,
        }
    }
}

impl<E: Entity> Clone for Lookup<E> {
    fn clone(&self) -> Self {
        match self {
            Lookup::Entity(entity) => Lookup::Entity(Arc::clone(entity)),
            Lookup::Projection(value) => Lookup::Projection(value.clone()),
        }
    }
}

impl<E: Entity> fmt::Debug for Lookup<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Entity(entity) => write!(f, "Entity({}@{})", entity.name(), entity.version()),
            Lookup::Projection(_) => write!(f, "Projection(..)"),
        }
    }
}
