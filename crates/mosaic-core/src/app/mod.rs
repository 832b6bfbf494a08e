//! App - アプリケーション層
//!
//! Combines the domain types and the ports into the engine.
//!
//! # 主要コンポーネント
//! - **Registry**: 登録済みアプリの保持（登録順）
//! - **activity**: activity 評価と load / mount / unmount / unload の分類
//! - **UnloadCoordinator**: unload 要求の重複排除と順序付け
//! - **Engine**: 公開 API
//! - **EngineBuilder**: 構築とワイヤリング
//! - **StatusCounts**: 状態ごとの集計ビュー

pub mod activity;
pub mod builder;
pub mod config;
pub mod engine;
pub mod registry;
pub mod status;
pub mod unload;

pub use self::activity::{
    Partition, apps_to_load, apps_to_mount, apps_to_unload, apps_to_unmount,
    check_activity_functions,
};
pub use self::builder::{BuildError, EngineBuilder};
pub use self::config::EngineConfig;
pub use self::engine::Engine;
pub use self::registry::Registry;
pub use self::status::StatusCounts;
pub use self::unload::{UnloadCoordinator, UnloadHandle, UnloadOptions};
