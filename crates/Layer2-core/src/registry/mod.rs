//! # Versioned Registry
//!
//! 이름과 semver 버전으로 엔티티(Service, Config)를 저장하고 조회합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  VersionedRegistry<E>                        │
//! │  RwLock<HashMap<name, BTreeMap<ver, Arc<E>>>>│
//! │  ┌────────────┬────────────┬──────────┐      │
//! │  │ http       │ db         │ ...      │      │
//! │  │ 1.0.0      │ 2.1.0      │          │      │
//! │  │ 1.2.0      │            │          │      │
//! │  └────────────┴────────────┴──────────┘      │
//! │        get("http@~1.0.0/listen")             │
//! │        -> split -> matching -> project       │
//! └──────────────────────────────────────────────┘
//! ```

mod traits;
mod versioned;

pub use traits::{Definition, Entity, Lookup};
pub use versioned::VersionedRegistry;
