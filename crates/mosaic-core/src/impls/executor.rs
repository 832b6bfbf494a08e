//! LocalExecutor - 開発用のライフサイクル実行器
//!
//! Runs the load / bootstrap / mount / unmount / unload procedures of
//! registered apps in-process and writes every status transition back into
//! the shared [`Registry`]. It also provides a reference reroute pass
//! ([`LocalExecutor::run_pass`]) so the engine can be driven end to end in
//! tests and in the demo binary.
//!
//! # 状態遷移
//! - load:      NOT_LOADED → LOADING_SOURCE_CODE → NOT_BOOTSTRAPPED
//! - bootstrap: NOT_BOOTSTRAPPED → BOOTSTRAPPING → NOT_MOUNTED
//! - mount:     NOT_MOUNTED → MOUNTING → MOUNTED
//! - unmount:   MOUNTED → UNMOUNTING → NOT_MOUNTED
//! - unload:    NOT_MOUNTED → UNLOADING → NOT_LOADED
//!
//! Any failing procedure leaves the app in SKIP_BECAUSE_BROKEN.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::{Engine, Partition, Registry};
use crate::domain::{AppInfo, AppStatus, CustomProps};
use crate::error::LifecycleError;
use crate::ports::{Application, LifecycleExecutor};

pub struct LocalExecutor<C> {
    registry: Arc<Registry<C>>,
    /// Implementations resolved by `load`, keyed by app name.
    loaded: Mutex<HashMap<String, Arc<dyn Application>>>,
}

impl<C: 'static> LocalExecutor<C> {
    pub fn new(registry: Arc<Registry<C>>) -> Self {
        Self {
            registry,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn implementation(&self, name: &str) -> Option<Arc<dyn Application>> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn forget(&self, name: &str) {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    fn status(&self, name: &str) -> Result<AppStatus, LifecycleError> {
        self.registry
            .app_status(name)
            .ok_or_else(|| LifecycleError::new(name, "not registered"))
    }

    fn set(&self, name: &str, status: AppStatus) -> Result<(), LifecycleError> {
        self.registry
            .set_status(name, status)
            .map_err(|e| LifecycleError::new(name, e.to_string()))
    }

    fn props(&self, name: &str) -> CustomProps {
        self.registry
            .find_by_name(name)
            .map(|app| app.custom_props)
            .unwrap_or_default()
    }

    fn require_loaded(&self, name: &str) -> Result<Arc<dyn Application>, LifecycleError> {
        self.implementation(name)
            .ok_or_else(|| LifecycleError::new(name, "implementation has not been loaded"))
    }

    /// Mark the app broken and hand the error back.
    fn broken(&self, name: &str, err: LifecycleError) -> LifecycleError {
        warn!(app = name, error = %err, "lifecycle procedure failed, skipping app");
        // the app may have been removed meanwhile; the original error matters more
        let _ = self.set(name, AppStatus::SkipBecauseBroken);
        err
    }

    /// Fetch the implementation. No-op when already loaded.
    pub async fn load(&self, name: &str) -> Result<(), LifecycleError> {
        let record = self
            .registry
            .find_by_name(name)
            .ok_or_else(|| LifecycleError::new(name, "not registered"))?;
        if record.status != AppStatus::NotLoaded {
            return Ok(());
        }

        self.set(name, AppStatus::LoadingSourceCode)?;
        match (record.load)().await {
            Ok(app) => {
                self.loaded
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), app);
                self.set(name, AppStatus::NotBootstrapped)
            }
            Err(err) => Err(self.broken(name, err)),
        }
    }

    pub async fn bootstrap(&self, name: &str) -> Result<(), LifecycleError> {
        if self.status(name)? != AppStatus::NotBootstrapped {
            return Ok(());
        }
        let app = self.require_loaded(name)?;

        self.set(name, AppStatus::Bootstrapping)?;
        match app.bootstrap(&self.props(name)).await {
            Ok(()) => self.set(name, AppStatus::NotMounted),
            Err(err) => Err(self.broken(name, err)),
        }
    }

    /// Bootstrap if needed, then mount.
    pub async fn mount(&self, name: &str) -> Result<(), LifecycleError> {
        self.bootstrap(name).await?;
        if self.status(name)? != AppStatus::NotMounted {
            return Ok(());
        }
        let app = self.require_loaded(name)?;

        self.set(name, AppStatus::Mounting)?;
        match app.mount(&self.props(name)).await {
            Ok(()) => self.set(name, AppStatus::Mounted),
            Err(err) => Err(self.broken(name, err)),
        }
    }

    /// One reference reroute pass for `ctx`:
    /// unmount → unload (settling pending unload requests) → load + mount → mount.
    ///
    /// Failures are logged and leave the app broken; the pass carries on with
    /// the other apps. Returns the partition the pass worked from.
    pub async fn run_pass(&self, engine: &Engine<C>, ctx: &C) -> Partition {
        let partition = engine.partition(ctx);
        if partition.is_empty() {
            return partition;
        }
        debug!(?partition, "reroute pass");

        for name in &partition.to_unmount {
            if let Some(info) = self.info(name) {
                let _ = self.unmount(&info).await;
            }
        }

        // the unmounts above may have made more apps eligible for unloading
        for app in engine.apps_to_unload() {
            // earlier awaits in this pass may have moved the app on
            let Some(info) = self.info(&app.name) else {
                continue;
            };
            if !matches!(
                info.status,
                AppStatus::NotLoaded | AppStatus::NotBootstrapped | AppStatus::NotMounted
            ) {
                debug!(app = %info.name, status = %info.status, "not unloadable yet, request stays pending");
                continue;
            }
            let result = self.unload(&info).await;
            engine.complete_unload(&app.name, result);
        }

        for name in &partition.to_load {
            if self.load(name).await.is_ok() {
                let _ = self.mount(name).await;
            }
        }

        for name in &partition.to_mount {
            let _ = self.mount(name).await;
        }

        partition
    }

    fn info(&self, name: &str) -> Option<AppInfo> {
        self.registry.find_by_name(name).map(|app| app.info())
    }
}

#[async_trait]
impl<C: 'static> LifecycleExecutor for LocalExecutor<C> {
    async fn unmount(&self, app: &AppInfo) -> Result<(), LifecycleError> {
        let name = app.name.as_str();
        if self.status(name)? != AppStatus::Mounted {
            return Ok(());
        }
        let implementation = self.require_loaded(name)?;

        self.set(name, AppStatus::Unmounting)?;
        match implementation.unmount(&app.custom_props).await {
            Ok(()) => self.set(name, AppStatus::NotMounted),
            Err(err) => Err(self.broken(name, err)),
        }
    }

    async fn unload(&self, app: &AppInfo) -> Result<(), LifecycleError> {
        let name = app.name.as_str();
        match self.status(name)? {
            AppStatus::NotLoaded => return Ok(()),
            AppStatus::NotMounted | AppStatus::NotBootstrapped => {}
            other => {
                return Err(LifecycleError::new(
                    name,
                    format!("cannot unload while {other}"),
                ));
            }
        }
        let implementation = self.require_loaded(name)?;

        self.set(name, AppStatus::Unloading)?;
        match implementation.unload(&app.custom_props).await {
            Ok(()) => {
                self.forget(name);
                self.set(name, AppStatus::NotLoaded)
            }
            Err(err) => {
                self.forget(name);
                Err(self.broken(name, err))
            }
        }
    }
}
