use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mosaic_core::app::{EngineBuilder, EngineConfig, Registry, UnloadOptions};
use mosaic_core::domain::{AppArg, CustomProps, Registration, load_fn};
use mosaic_core::error::LifecycleError;
use mosaic_core::impls::{ChannelReroute, LocalExecutor};
use mosaic_core::ports::{Application, LifecycleExecutor, Loader};

/// Routing context for the demo: just the current path.
#[derive(Debug, Clone, Serialize)]
struct Location {
    path: String,
}

impl Location {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

/// Application that only logs its lifecycle.
struct Printer {
    name: &'static str,
}

#[async_trait]
impl Application for Printer {
    async fn bootstrap(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
        info!(app = self.name, "bootstrap");
        Ok(())
    }

    async fn mount(&self, props: &CustomProps) -> Result<(), LifecycleError> {
        info!(app = self.name, ?props, "mount");
        Ok(())
    }

    async fn unmount(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
        info!(app = self.name, "unmount");
        Ok(())
    }

    async fn unload(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
        info!(app = self.name, "unload");
        Ok(())
    }
}

/// Global fallback loader: builds a `Printer` for any known name.
struct DemoLoader;

#[async_trait]
impl Loader for DemoLoader {
    async fn import(&self, name: &str) -> Result<Arc<dyn Application>, LifecycleError> {
        match name {
            "dashboard" => Ok(Arc::new(Printer { name: "dashboard" })),
            other => Err(LifecycleError::new(other, "no bundle for this app")),
        }
    }
}

fn load_config() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

/// immediate unload 後の遅延 reroute を待つ（設定で無効なら待たない）
async fn deferred_reroute(config: &EngineConfig, rx: &mut UnboundedReceiver<()>) -> bool {
    config.reroute_after_unload && rx.recv().await.is_some()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) registry / executor / reroute channel を用意
    let registry: Arc<Registry<Location>> = Arc::new(Registry::new());
    let executor = Arc::new(LocalExecutor::new(Arc::clone(&registry)));
    let (reroute, mut reroute_rx) = ChannelReroute::new();

    let engine = EngineBuilder::new()
        .config(load_config()?)
        .registry(Arc::clone(&registry))
        .executor(Arc::clone(&executor) as Arc<dyn LifecycleExecutor>)
        .reroute(Arc::new(reroute))
        .loader(Arc::new(DemoLoader))
        .build()?;

    // (B) アプリを登録（static / loader / legacy global loader）
    engine.register(
        Registration::static_value("navbar", Arc::new(Printer { name: "navbar" }))
            .active_when(|_: &Location| true)
            .custom_props(json!({ "theme": "dark" })),
    )?;
    engine.register(
        Registration::loader(
            "settings",
            load_fn(|| async { Ok::<Arc<dyn Application>, LifecycleError>(Arc::new(Printer { name: "settings" })) }),
        )
        .active_when(|loc: &Location| loc.path.starts_with("/settings")),
    )?;
    engine.register_application(
        "dashboard",
        AppArg::active_when(|loc: &Location| loc.path.starts_with("/dashboard")),
        None,
        json!(null),
    )?;
    info!(apps = ?engine.app_names(), "registered");

    // (C) ナビゲーションを模擬: reroute 要求をまとめて 1 パスずつ処理
    for path in ["/", "/settings", "/dashboard", "/settings"] {
        let location = Location::new(path);
        while reroute_rx.try_recv().is_ok() {}
        let partition = executor.run_pass(&engine, &location).await;
        info!(
            path,
            active = ?engine.check_activity_functions(&location),
            mounted = ?engine.mounted_apps(),
            partition = %serde_json::to_string(&partition)?,
            "navigated"
        );
    }

    // (D) wait-for-unmount: dashboard は既に unmount 済みなので次のパスで unload される
    let waiting = engine.unload_application("dashboard", UnloadOptions::wait_for_unmount())?;
    let here = Location::new("/settings");
    executor.run_pass(&engine, &here).await;
    waiting.await?;
    info!(status = ?engine.app_status("dashboard"), "dashboard unloaded after unmount");

    // (E) immediate: settings を unmount → unload し、後続の reroute で再 mount
    let forced = engine.unload_application("settings", UnloadOptions::immediate())?;
    forced.await?;
    info!(status = ?engine.app_status("settings"), "settings unloaded");

    if deferred_reroute(engine.config(), &mut reroute_rx).await {
        info!("deferred reroute received");
    }
    executor.run_pass(&engine, &here).await;
    info!(mounted = ?engine.mounted_apps(), "settings remounted");

    println!("{}", serde_json::to_string_pretty(&engine.status_counts())?);
    Ok(())
}
