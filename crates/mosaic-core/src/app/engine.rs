//! Engine - 公開 API の表面
//!
//! Ties the registry, the partition queries and the unload coordinator
//! together and owns the side effects of registration (compatibility check,
//! reroute). Hosts build one through [`EngineBuilder`](super::EngineBuilder).

use std::sync::Arc;

use tracing::{info, warn};

use super::activity::{self, Partition};
use super::config::EngineConfig;
use super::registry::Registry;
use super::status::StatusCounts;
use super::unload::{UnloadCoordinator, UnloadHandle, UnloadOptions};
use crate::domain::{AppArg, AppRecord, AppStatus, Registration};
use crate::error::{EngineError, LifecycleError};
use crate::ports::{CompatibilityShim, Loader, RerouteTrigger};

pub struct Engine<C> {
    registry: Arc<Registry<C>>,
    coordinator: UnloadCoordinator<C>,
    loader: Option<Arc<dyn Loader>>,
    reroute: Arc<dyn RerouteTrigger>,
    compat: Arc<dyn CompatibilityShim>,
    config: EngineConfig,
}

impl<C: 'static> Engine<C> {
    pub(crate) fn from_parts(
        registry: Arc<Registry<C>>,
        coordinator: UnloadCoordinator<C>,
        loader: Option<Arc<dyn Loader>>,
        reroute: Arc<dyn RerouteTrigger>,
        compat: Arc<dyn CompatibilityShim>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            coordinator,
            loader,
            reroute,
            compat,
            config,
        }
    }

    /// 共有レジストリ
    pub fn registry(&self) -> &Arc<Registry<C>> {
        &self.registry
    }

    /// unload コーディネーター
    pub fn coordinator(&self) -> &UnloadCoordinator<C> {
        &self.coordinator
    }

    /// 現在の設定
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── registration ────────────────────────────────────────────────────────

    /// Register one app. On success the compatibility shim is checked and a
    /// reroute is triggered.
    pub fn register(&self, registration: Registration<C>) -> Result<(), EngineError> {
        let name = registration.name.clone();
        let source = registration.source.kind();
        self.registry.insert(registration, self.loader.as_ref())?;
        info!(app = %name, source, "application registered");

        self.compat.ensure_support();
        if self.config.reroute_on_register {
            self.reroute.reroute();
        }
        Ok(())
    }

    /// Positional form: `(name, value | loader, active_when, props)` or the
    /// legacy loader-less `(name, active_when)`.
    pub fn register_application(
        &self,
        name: impl Into<String>,
        arg1: AppArg<C>,
        arg2: Option<AppArg<C>>,
        custom_props: serde_json::Value,
    ) -> Result<(), EngineError> {
        self.register(Registration::from_overload(name, arg1, arg2, custom_props)?)
    }

    #[deprecated(note = "Use `register_application` instead. This alias will be removed in a future version.")]
    pub fn declare_child_application(
        &self,
        name: impl Into<String>,
        arg1: AppArg<C>,
        arg2: Option<AppArg<C>>,
    ) -> Result<(), EngineError> {
        self.deprecation_notice("declare_child_application", "register_application");
        self.register_application(name, arg1, arg2, serde_json::Value::Null)
    }

    // ── unloading ───────────────────────────────────────────────────────────

    /// unload 要求を作成または既存の要求に合流する
    pub fn unload_application(
        &self,
        name: &str,
        options: UnloadOptions,
    ) -> Result<UnloadHandle, EngineError> {
        self.coordinator.unload_application(name, options)
    }

    #[deprecated(note = "Use `unload_application` instead. This alias will be removed in a future version.")]
    pub fn unload_child_application(
        &self,
        name: &str,
        options: UnloadOptions,
    ) -> Result<UnloadHandle, EngineError> {
        self.deprecation_notice("unload_child_application", "unload_application");
        self.unload_application(name, options)
    }

    /// See [`UnloadCoordinator::complete_unload`].
    pub fn complete_unload(&self, name: &str, result: Result<(), LifecycleError>) -> bool {
        self.coordinator.complete_unload(name, result)
    }

    fn deprecation_notice(&self, old: &str, new: &str) {
        if self.config.warn_on_deprecated {
            warn!(
                deprecated = old,
                replacement = new,
                "{old} is deprecated and will be removed in the next major version, use {new} instead"
            );
        }
    }

    // ── queries ─────────────────────────────────────────────────────────────

    /// 全アプリ名（登録順）
    pub fn app_names(&self) -> Vec<String> {
        self.registry.app_names()
    }

    /// アプリの現在の状態
    pub fn app_status(&self, name: &str) -> Option<AppStatus> {
        self.registry.app_status(name)
    }

    /// MOUNTED のアプリ名
    pub fn mounted_apps(&self) -> Vec<String> {
        self.registry.mounted_apps()
    }

    /// `ctx` でアクティブなアプリ名
    pub fn check_activity_functions(&self, ctx: &C) -> Vec<String> {
        activity::check_activity_functions(&self.registry, ctx)
    }

    /// load すべきアプリ
    pub fn apps_to_load(&self, ctx: &C) -> Vec<AppRecord<C>> {
        activity::apps_to_load(&self.registry, ctx)
    }

    /// mount すべきアプリ
    pub fn apps_to_mount(&self, ctx: &C) -> Vec<AppRecord<C>> {
        activity::apps_to_mount(&self.registry, ctx)
    }

    /// unmount すべきアプリ
    pub fn apps_to_unmount(&self, ctx: &C) -> Vec<AppRecord<C>> {
        activity::apps_to_unmount(&self.registry, ctx)
    }

    /// reroute パスで unload してよいアプリ
    pub fn apps_to_unload(&self) -> Vec<AppRecord<C>> {
        activity::apps_to_unload(&self.registry, &self.coordinator.unloadable_names())
    }

    /// All four work sets for one reroute pass.
    pub fn partition(&self, ctx: &C) -> Partition {
        Partition::compute(&self.registry, ctx, &self.coordinator.unloadable_names())
    }

    /// 状態ごとの集計
    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_records(&self.registry.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rstest::rstest;
    use serde_json::json;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use crate::app::EngineBuilder;
    use crate::domain::{AppInfo, CustomProps, load_fn};
    use crate::ports::{Application, LifecycleExecutor};

    #[derive(Debug, Clone)]
    struct Loc {
        path: String,
    }

    fn at(path: &str) -> Loc {
        Loc { path: path.to_string() }
    }

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

    struct NoopLoader;

    #[async_trait]
    impl Loader for NoopLoader {
        async fn import(&self, _name: &str) -> Result<Arc<dyn Application>, LifecycleError> {
            Ok(Arc::new(Noop))
        }
    }

    struct NoopExecutor;

    #[async_trait]
    impl LifecycleExecutor for NoopExecutor {
        async fn unmount(&self, _app: &AppInfo) -> Result<(), LifecycleError> {
            Ok(())
        }
        async fn unload(&self, _app: &AppInfo) -> Result<(), LifecycleError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Counter {
        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl RerouteTrigger for Counter {
        fn reroute(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CompatibilityShim for Counter {
        fn ensure_support(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        engine: Engine<Loc>,
        reroutes: Arc<Counter>,
        compat_checks: Arc<Counter>,
    }

    fn harness(with_loader: bool, config: EngineConfig) -> Harness {
        let reroutes = Arc::new(Counter::default());
        let compat_checks = Arc::new(Counter::default());
        let mut builder = EngineBuilder::new()
            .config(config)
            .executor(Arc::new(NoopExecutor))
            .reroute(Arc::clone(&reroutes) as Arc<dyn RerouteTrigger>)
            .compat(Arc::clone(&compat_checks) as Arc<dyn CompatibilityShim>);
        if with_loader {
            builder = builder.loader(Arc::new(NoopLoader));
        }
        Harness {
            engine: builder.build().unwrap(),
            reroutes,
            compat_checks,
        }
    }

    fn on(path: &'static str) -> AppArg<Loc> {
        AppArg::active_when(move |loc: &Loc| loc.path == path)
    }

    #[test]
    fn registration_checks_compat_and_reroutes() {
        let h = harness(false, EngineConfig::default());
        h.engine
            .register_application("app1", AppArg::Value(Arc::new(Noop)), Some(on("/a")), json!({}))
            .unwrap();

        assert_eq!(h.engine.app_names(), vec!["app1"]);
        assert_eq!(h.engine.app_status("app1"), Some(AppStatus::NotLoaded));
        assert_eq!(h.compat_checks.get(), 1);
        assert_eq!(h.reroutes.get(), 1);
    }

    #[test]
    fn failed_registration_has_no_side_effects() {
        let h = harness(false, EngineConfig::default());
        h.engine
            .register_application("app1", AppArg::Value(Arc::new(Noop)), Some(on("/a")), json!({}))
            .unwrap();

        let err = h
            .engine
            .register_application("app1", AppArg::Value(Arc::new(Noop)), Some(on("/b")), json!({}))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRegistration(_)));
        assert_eq!(h.engine.app_names(), vec!["app1"]);
        assert_eq!(h.compat_checks.get(), 1);
        assert_eq!(h.reroutes.get(), 1);
    }

    #[test]
    fn reroute_on_register_can_be_disabled() {
        let h = harness(
            false,
            EngineConfig {
                reroute_on_register: false,
                ..Default::default()
            },
        );
        h.engine
            .register(Registration::static_value("app1", Arc::new(Noop)).with_activity(Arc::new(|_: &Loc| true)))
            .unwrap();
        assert_eq!(h.reroutes.get(), 0);
        assert_eq!(h.compat_checks.get(), 1);
    }

    #[test]
    fn legacy_form_needs_global_loader() {
        let without = harness(false, EngineConfig::default());
        let err = without
            .engine
            .register_application("legacy", on("/"), None, json!(null))
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(without.engine.app_names().is_empty());

        let with = harness(true, EngineConfig::default());
        with.engine
            .register_application("legacy", on("/"), None, json!(null))
            .unwrap();
        assert_eq!(with.engine.app_names(), vec!["legacy"]);
    }

    #[test]
    fn non_predicate_activity_is_rejected() {
        let h = harness(false, EngineConfig::default());
        let loader = load_fn(|| async { Ok::<Arc<dyn Application>, LifecycleError>(Arc::new(Noop)) });
        let err = h
            .engine
            .register_application(
                "app1",
                AppArg::Loader(loader),
                Some(AppArg::Value(Arc::new(Noop))),
                json!({}),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(h.reroutes.get(), 0);
    }

    #[test]
    fn partition_scenario_follows_location() {
        let h = harness(false, EngineConfig::default());
        h.engine
            .register_application("app1", AppArg::Value(Arc::new(Noop)), Some(on("/a")), json!({}))
            .unwrap();

        let to_load: Vec<String> = h
            .engine
            .apps_to_load(&at("/a"))
            .into_iter()
            .map(|app| app.name)
            .collect();
        assert_eq!(to_load, vec!["app1"]);
        assert!(h.engine.apps_to_load(&at("/b")).is_empty());

        let p = h.engine.partition(&at("/a"));
        assert_eq!(p.to_load, vec!["app1"]);
        assert!(p.to_mount.is_empty() && p.to_unmount.is_empty() && p.to_unload.is_empty());
    }

    #[allow(deprecated)]
    #[test]
    fn deprecated_aliases_forward() {
        let h = harness(false, EngineConfig::default());
        h.engine
            .declare_child_application("old", AppArg::Value(Arc::new(Noop)), Some(on("/")))
            .unwrap();
        assert_eq!(h.engine.app_names(), vec!["old"]);

        let err = h
            .engine
            .unload_child_application("ghost", UnloadOptions::default())
            .err()
            .unwrap();
        assert_eq!(err, EngineError::NotFound("ghost".into()));
    }

    /// Counts WARN events seen while installed.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&count)));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::SeqCst)
    }

    #[rstest]
    #[case::enabled(true, 2)]
    #[case::disabled(false, 0)]
    #[allow(deprecated)]
    fn deprecated_aliases_warn_unless_disabled(#[case] warn: bool, #[case] expected: usize) {
        let h = harness(
            false,
            EngineConfig {
                warn_on_deprecated: warn,
                ..Default::default()
            },
        );
        let warnings = warnings_during(|| {
            h.engine
                .declare_child_application("old", AppArg::Value(Arc::new(Noop)), Some(on("/")))
                .unwrap();
            let _ = h.engine.unload_child_application("ghost", UnloadOptions::default());
        });
        assert_eq!(warnings, expected);
        assert_eq!(h.engine.app_names(), vec!["old"]);
    }

    #[tokio::test]
    async fn waiting_unload_shows_up_in_unload_set_once_unmounted() {
        let h = harness(false, EngineConfig::default());
        h.engine
            .register_application("app1", AppArg::Value(Arc::new(Noop)), Some(on("/a")), json!({}))
            .unwrap();
        h.engine.registry().set_status("app1", AppStatus::Mounted).unwrap();

        let handle = h
            .engine
            .unload_application("app1", UnloadOptions::wait_for_unmount())
            .unwrap();
        assert!(h.engine.apps_to_unload().is_empty());

        h.engine.registry().set_status("app1", AppStatus::NotMounted).unwrap();
        assert_eq!(h.engine.partition(&at("/b")).to_unload, vec!["app1"]);

        assert!(h.engine.complete_unload("app1", Ok(())));
        assert_eq!(handle.await, Ok(()));
        assert!(h.engine.apps_to_unload().is_empty());
    }

    #[test]
    fn status_counts_cover_every_app() {
        let h = harness(false, EngineConfig::default());
        for name in ["a", "b", "c"] {
            h.engine
                .register_application(name, AppArg::Value(Arc::new(Noop)), Some(on("/")), json!({}))
                .unwrap();
        }
        h.engine.registry().set_status("b", AppStatus::Mounted).unwrap();

        let counts = h.engine.status_counts();
        assert_eq!(counts.not_loaded, 2);
        assert_eq!(counts.mounted, 1);
        assert_eq!(counts.total(), 3);
    }
}
