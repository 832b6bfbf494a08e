//! Registry - 登録済みアプリの管理
//!
//! Owns every [`AppRecord`] in registration order. It is an ordinary value
//! (usually behind an `Arc`), so tests and hosts can run independent
//! registries side by side.
//!
//! # 設計
//! - The lock is held only for synchronous bookkeeping; queries return
//!   cloned snapshots so activity predicates never run under the lock.
//! - Registration validation is synchronous: every contract violation is
//!   returned by `insert` itself and leaves the registry unchanged.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use crate::domain::{
    AppRecord, AppSource, AppStatus, CustomProps, Registration, global_load_fn, static_load_fn,
};
use crate::error::EngineError;
use crate::ports::Loader;

pub struct Registry<C> {
    apps: RwLock<Vec<AppRecord<C>>>,
}

impl<C> Registry<C> {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self {
            apps: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AppRecord<C>>> {
        self.apps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AppRecord<C>>> {
        self.apps.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a registration and append it with status `NOT_LOADED`.
    ///
    /// `fallback` is the global loader used by `AppSource::GlobalLoader`.
    pub fn insert(
        &self,
        registration: Registration<C>,
        fallback: Option<&Arc<dyn Loader>>,
    ) -> Result<(), EngineError> {
        let Registration {
            name,
            source,
            active_when,
            custom_props,
        } = registration;

        if name.is_empty() {
            return Err(EngineError::InvalidArgument(
                "the app name must be a non-empty string".to_string(),
            ));
        }
        if self.contains(&name) {
            return Err(EngineError::DuplicateRegistration(name));
        }
        let custom_props = match custom_props {
            serde_json::Value::Null => CustomProps::new(),
            serde_json::Value::Object(map) => map,
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "custom props for '{name}' must be an object, got {other}"
                )));
            }
        };

        let load = match source {
            AppSource::Static(app) => static_load_fn(app),
            AppSource::Loader(load) => load,
            AppSource::GlobalLoader => {
                let loader = fallback.ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "'{name}' was registered without a way to load it and no global loader is configured"
                    ))
                })?;
                global_load_fn(Arc::clone(loader), name.clone())
            }
        };
        let active_when = active_when.ok_or_else(|| {
            EngineError::InvalidArgument(format!("the activity predicate for '{name}' is missing"))
        })?;

        // re-checked under the write lock
        let mut apps = self.write();
        if apps.iter().any(|app| app.name == name) {
            return Err(EngineError::DuplicateRegistration(name));
        }
        apps.push(AppRecord::new(name, load, active_when, custom_props));
        Ok(())
    }

    /// All names, in registration order.
    pub fn app_names(&self) -> Vec<String> {
        self.read().iter().map(|app| app.name.clone()).collect()
    }

    /// `None` when no app has that name.
    pub fn app_status(&self, name: &str) -> Option<AppStatus> {
        self.read()
            .iter()
            .find(|app| app.name == name)
            .map(|app| app.status)
    }

    /// MOUNTED のアプリ名（登録順）
    pub fn mounted_apps(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|app| app.status.is_active())
            .map(|app| app.name.clone())
            .collect()
    }

    /// 名前でレコードを検索（コピーを返す）
    pub fn find_by_name(&self, name: &str) -> Option<AppRecord<C>> {
        self.read().iter().find(|app| app.name == name).cloned()
    }

    /// 登録済みかどうか
    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|app| app.name == name)
    }

    /// Consistent copy of every record (one lock acquisition).
    pub fn snapshot(&self) -> Vec<AppRecord<C>> {
        self.read().clone()
    }

    /// Status write-back for lifecycle executors.
    pub fn set_status(&self, name: &str, status: AppStatus) -> Result<(), EngineError> {
        let mut apps = self.write();
        let app = apps
            .iter_mut()
            .find(|app| app.name == name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        if app.status != status {
            debug!(app = name, from = %app.status, to = %status, "status changed");
            app.status = status;
            app.status_changed_at = Utc::now();
        }
        Ok(())
    }

    /// 登録数
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// 登録が 1 件もないか
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
