//! Application descriptor and the function types it carries.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::AppStatus;
use crate::error::LifecycleError;
use crate::ports::{Application, Loader};

/// Opaque properties handed to an app's lifecycle procedures.
pub type CustomProps = serde_json::Map<String, serde_json::Value>;

/// Zero-argument operation resolving to the app's implementation.
pub type LoadFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Application>, LifecycleError>> + Send + Sync>;

/// Pure predicate over the routing context.
pub type ActivityFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Wrap a closure returning a future as a [`LoadFn`].
pub fn load_fn<F, Fut>(f: F) -> LoadFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Arc<dyn Application>, LifecycleError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// A [`LoadFn`] that resolves immediately to an already constructed value.
pub fn static_load_fn(app: Arc<dyn Application>) -> LoadFn {
    Arc::new(move || futures::future::ready(Ok::<_, LifecycleError>(Arc::clone(&app))).boxed())
}

/// A [`LoadFn`] that defers to the global loader by app name.
pub fn global_load_fn(loader: Arc<dyn Loader>, name: String) -> LoadFn {
    Arc::new(move || {
        let loader = Arc::clone(&loader);
        let name = name.clone();
        async move { loader.import(&name).await }.boxed()
    })
}

pub fn activity_fn<C, F>(f: F) -> ActivityFn<C>
where
    F: Fn(&C) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One registered application.
///
/// Cloning is cheap (functions are behind `Arc`); registry queries hand out
/// clones so nobody holds the registry lock while running user code.
pub struct AppRecord<C> {
    pub name: String,
    pub load: LoadFn,
    pub active_when: ActivityFn<C>,
    pub status: AppStatus,
    pub custom_props: CustomProps,
    pub status_changed_at: DateTime<Utc>,
}

impl<C> AppRecord<C> {
    pub fn new(name: String, load: LoadFn, active_when: ActivityFn<C>, custom_props: CustomProps) -> Self {
        Self {
            name,
            load,
            active_when,
            status: AppStatus::NotLoaded,
            custom_props,
            status_changed_at: Utc::now(),
        }
    }

    pub fn should_be_active(&self, ctx: &C) -> bool {
        (self.active_when)(ctx)
    }

    pub fn info(&self) -> AppInfo {
        AppInfo {
            name: self.name.clone(),
            status: self.status,
            custom_props: self.custom_props.clone(),
        }
    }
}

impl<C> Clone for AppRecord<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            load: Arc::clone(&self.load),
            active_when: Arc::clone(&self.active_when),
            status: self.status,
            custom_props: self.custom_props.clone(),
            status_changed_at: self.status_changed_at,
        }
    }
}

impl<C> fmt::Debug for AppRecord<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRecord")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("custom_props", &self.custom_props)
            .field("status_changed_at", &self.status_changed_at)
            .finish_non_exhaustive()
    }
}

/// Non-generic view of an app, given to lifecycle executors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub status: AppStatus,
    #[serde(default)]
    pub custom_props: CustomProps,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Application for Noop {
        async fn mount(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
            Ok(())
        }
        async fn unmount(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn static_load_fn_resolves_to_the_same_value() {
        let app: Arc<dyn Application> = Arc::new(Noop);
        let load = static_load_fn(Arc::clone(&app));
        let a = load().await.unwrap();
        let b = load().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &app));
    }

    #[test]
    fn new_record_starts_not_loaded() {
        let record: AppRecord<String> = AppRecord::new(
            "nav".into(),
            static_load_fn(Arc::new(Noop)),
            activity_fn(|path: &String| path.starts_with("/nav")),
            CustomProps::new(),
        );
        assert_eq!(record.status, AppStatus::NotLoaded);
        assert!(record.should_be_active(&"/nav/1".to_string()));
        assert!(!record.should_be_active(&"/other".to_string()));
        assert_eq!(record.info().name, "nav");
    }
}
