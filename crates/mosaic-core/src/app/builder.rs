//! EngineBuilder - エンジンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - The reroute trigger and the lifecycle executor have no sensible
//!   default, so `build()` refuses to produce an engine without them.
//! - The compatibility shim defaults to [`NoopCompat`]; the global loader is
//!   optional (only the legacy loader-less registration form needs it).

use std::sync::Arc;

use super::config::EngineConfig;
use super::engine::Engine;
use super::registry::Registry;
use super::unload::UnloadCoordinator;
use crate::impls::NoopCompat;
use crate::ports::{CompatibilityShim, LifecycleExecutor, Loader, RerouteTrigger};

/// # 使用例
/// ```ignore
/// let registry = Arc::new(Registry::new());
/// let executor = Arc::new(LocalExecutor::new(Arc::clone(&registry)));
/// let engine = EngineBuilder::new()
///     .registry(Arc::clone(&registry))
///     .executor(executor)
///     .reroute(Arc::new(reroute))
///     .build()?;
/// ```
pub struct EngineBuilder<C> {
    registry: Option<Arc<Registry<C>>>,
    config: EngineConfig,
    loader: Option<Arc<dyn Loader>>,
    reroute: Option<Arc<dyn RerouteTrigger>>,
    executor: Option<Arc<dyn LifecycleExecutor>>,
    compat: Option<Arc<dyn CompatibilityShim>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Missing component: {0}. It must be provided before build().")]
    MissingComponent(&'static str),
}

impl<C: 'static> EngineBuilder<C> {
    /// 空のビルダーを作成
    pub fn new() -> Self {
        Self {
            registry: None,
            config: EngineConfig::default(),
            loader: None,
            reroute: None,
            executor: None,
            compat: None,
        }
    }

    /// Share an existing registry (e.g. with the lifecycle executor).
    pub fn registry(mut self, registry: Arc<Registry<C>>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 設定を指定
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Global fallback loader for loader-less registrations.
    pub fn loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// reroute トリガーを指定（必須）
    pub fn reroute(mut self, reroute: Arc<dyn RerouteTrigger>) -> Self {
        self.reroute = Some(reroute);
        self
    }

    /// ライフサイクル実行器を指定（必須）
    pub fn executor(mut self, executor: Arc<dyn LifecycleExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// 互換レイヤーを指定（省略時は NoopCompat）
    pub fn compat(mut self, compat: Arc<dyn CompatibilityShim>) -> Self {
        self.compat = Some(compat);
        self
    }

    /// エンジンを構築
    pub fn build(self) -> Result<Engine<C>, BuildError> {
        let reroute = self.reroute.ok_or(BuildError::MissingComponent("reroute"))?;
        let executor = self
            .executor
            .ok_or(BuildError::MissingComponent("executor"))?;
        let registry = self.registry.unwrap_or_default();
        let compat = self
            .compat
            .unwrap_or_else(|| Arc::new(NoopCompat) as Arc<dyn CompatibilityShim>);

        let coordinator =
            UnloadCoordinator::new(Arc::clone(&registry), executor, Arc::clone(&reroute))
                .with_reroute_after_unload(self.config.reroute_after_unload);

        Ok(Engine::from_parts(
            registry,
            coordinator,
            self.loader,
            reroute,
            compat,
            self.config,
        ))
    }
}

impl<C: 'static> Default for EngineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
