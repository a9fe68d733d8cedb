//! stater-core: 버전 관리되는 서비스 런타임
//!
//! Layer2 - 서비스 등록, 의존성 주입, 실행 레이어
//!
//! # 주요 모듈
//!
//! - `registry`: 이름 + semver 버전으로 엔티티를 보관하는 레지스트리
//! - `resolver`: 이름 목록을 스코프 순서대로 해석하는 의존성 주입
//! - `config`: 버전이 있는 설정 데이터
//! - `service`: 서비스 템플릿, 실행 단위, Context 바인딩
//! - `context`: 한 번의 실행 (sync/async, 완료 리스너)
//! - `store`: 서비스 저장소와 Context 생성
//! - `runtime`: 위 구성 요소를 묶는 `Stater` 핸들, 정의 파일 로더
//!
//! # 사용 예시
//!
//! ```ignore
//! use stater_core::{Injectable, ServiceDefinition, Stater};
//! use serde_json::json;
//!
//! let stater = Stater::new();
//! stater.add_service(
//!     "hello",
//!     ServiceDefinition::callable(Injectable::new("hello", &["storage", "logger"], |args| {
//!         let storage = args.storage(0).ok_or("storage not injected")?;
//!         storage.set("greeting", json!("hello"))
//!     })),
//! )?;
//!
//! stater.bootstrap("./services/*.json")?;
//! stater.initialize();
//!
//! let context = stater.sync(vec!["db", "hello"], json!({ "user": "kim" }))?;
//! context.then(|storage| println!("{}", storage.snapshot()));
//! context.wait().await;
//! ```

pub mod config;
pub mod context;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod service;
pub mod store;

// Re-exports: Registry
pub use registry::{Definition, Entity, Lookup, VersionedRegistry};

// Re-exports: Resolver
pub use resolver::{
    Args, Dependency, MapScope, ModuleRegistry, ModuleSource, Resolver, Scope,
};

// Re-exports: Config
pub use config::{Config, ConfigClass, ConfigDefinition, ConfigStore};

// Re-exports: Service
pub use service::{
    BoundService, Factory, HandlerObject, Injectable, Member, Outcome, Service,
    ServiceDefinition, ServiceStatus, ServiceUnit, Units,
};

// Re-exports: Context
pub use context::{Context, ContextStatus, Runnable};

// Re-exports: Store
pub use store::{InitialData, Selector, ServiceStore};

// Re-exports: Runtime
pub use runtime::{
    ControlScope, Module, ObjectHelper, Stater, StaterBuilder, StaterStatus, StorageClass,
    VersionHelper, CONTROL_NAMES, INIT_CONTROL_NAMES,
};

// Re-exports: Foundation
pub use stater_foundation::{Error, Logger, Result, RunMode, RuntimeConfig, Storage};
