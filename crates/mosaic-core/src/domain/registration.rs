//! Registration requests.
//!
//! The registry only accepts the tagged [`Registration`]; the overloaded
//! argument forms (`value | loader`, legacy loader-less) are resolved here by
//! [`Registration::from_overload`] so the registry itself stays overload-free.

use std::fmt;
use std::sync::Arc;

use super::app::{ActivityFn, LoadFn};
use crate::error::EngineError;
use crate::ports::Application;

/// Where an app's implementation comes from.
#[derive(Clone)]
pub enum AppSource {
    /// Already constructed value; wrapped so it resolves immediately.
    Static(Arc<dyn Application>),
    /// Caller-supplied loading operation.
    Loader(LoadFn),
    /// Legacy form: defer to the engine's global fallback loader by name.
    GlobalLoader,
}

impl AppSource {
    pub fn kind(&self) -> &'static str {
        match self {
            AppSource::Static(_) => "static",
            AppSource::Loader(_) => "loader",
            AppSource::GlobalLoader => "global_loader",
        }
    }
}

impl fmt::Debug for AppSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A request to add one app to the registry.
///
/// # 使用例
/// ```ignore
/// let reg = Registration::loader("settings", load_fn(|| async { ... }))
///     .active_when(|loc: &Location| loc.path.starts_with("/settings"))
///     .custom_props(json!({ "theme": "dark" }));
/// engine.register(reg)?;
/// ```
pub struct Registration<C> {
    pub name: String,
    pub source: AppSource,
    /// `None` is rejected at registration with `InvalidArgument`.
    pub active_when: Option<ActivityFn<C>>,
    /// Must be a JSON object (`null` means "no props").
    pub custom_props: serde_json::Value,
}

impl<C> Registration<C> {
    pub fn new(name: impl Into<String>, source: AppSource) -> Self {
        Self {
            name: name.into(),
            source,
            active_when: None,
            custom_props: serde_json::Value::Null,
        }
    }

    pub fn static_value(name: impl Into<String>, app: Arc<dyn Application>) -> Self {
        Self::new(name, AppSource::Static(app))
    }

    pub fn loader(name: impl Into<String>, load: LoadFn) -> Self {
        Self::new(name, AppSource::Loader(load))
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, AppSource::GlobalLoader)
    }

    pub fn active_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.active_when = Some(Arc::new(f));
        self
    }

    pub fn with_activity(mut self, f: ActivityFn<C>) -> Self {
        self.active_when = Some(f);
        self
    }

    pub fn custom_props(mut self, props: serde_json::Value) -> Self {
        self.custom_props = props;
        self
    }

    /// Resolve the legacy positional form `(name, arg1, arg2?, props)`.
    ///
    /// - no `arg2`: loader-less form, `arg1` is the activity predicate and the
    ///   app is loaded through the global loader;
    /// - `arg1` is a value: static app, `arg2` is the predicate;
    /// - `arg1` is a loader: `arg2` is the predicate.
    ///
    /// A missing or misplaced predicate is left as `None` and reported by the
    /// registry, after name and props have been checked.
    pub fn from_overload(
        name: impl Into<String>,
        arg1: AppArg<C>,
        arg2: Option<AppArg<C>>,
        custom_props: serde_json::Value,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        let (source, active_when) = match (arg1, arg2) {
            (arg1, None) => (AppSource::GlobalLoader, arg1.into_activity()),
            (AppArg::Value(app), Some(arg2)) => (AppSource::Static(app), arg2.into_activity()),
            (AppArg::Loader(load), Some(arg2)) => (AppSource::Loader(load), arg2.into_activity()),
            (AppArg::ActiveWhen(_), Some(_)) => {
                return Err(EngineError::InvalidArgument(format!(
                    "the second argument for '{name}' must be a loader or an application value"
                )));
            }
        };
        Ok(Self {
            name,
            source,
            active_when,
            custom_props,
        })
    }
}

impl<C> fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("has_active_when", &self.active_when.is_some())
            .field("custom_props", &self.custom_props)
            .finish()
    }
}

/// One positional argument of the legacy registration form.
pub enum AppArg<C> {
    Value(Arc<dyn Application>),
    Loader(LoadFn),
    ActiveWhen(ActivityFn<C>),
}

impl<C> AppArg<C> {
    pub fn active_when<F>(f: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        AppArg::ActiveWhen(Arc::new(f))
    }

    fn into_activity(self) -> Option<ActivityFn<C>> {
        match self {
            AppArg::ActiveWhen(f) => Some(f),
            AppArg::Value(_) | AppArg::Loader(_) => None,
        }
    }
}
