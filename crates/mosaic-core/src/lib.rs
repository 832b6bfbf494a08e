//! mosaic-core
//!
//! Application registry and lifecycle orchestration.
//!
//! Tracks independently loadable sub-applications, decides for a routing
//! context which of them should be loaded, mounted or unmounted, and
//! coordinates deduplicated unload requests.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（AppStatus, AppRecord, Registration）
//! - **ports**: 外部コラボレーター（Application, Loader, LifecycleExecutor, RerouteTrigger, CompatibilityShim）
//! - **app**: Registry, activity / partition, UnloadCoordinator, Engine, EngineBuilder
//! - **impls**: 開発用の実装（ChannelReroute, NoopCompat, LocalExecutor）
//! - **error**: エラー型

pub mod domain;
pub mod error;
pub mod ports;
pub mod app;
pub mod impls;

pub use app::{Engine, EngineBuilder, EngineConfig, Registry, UnloadHandle, UnloadOptions};
pub use error::{EngineError, LifecycleError, UnloadError};
