//! Ports - 外部コラボレーターの抽象化レイヤー
//!
//! Each trait is a seam to something the core deliberately does not own:
//! fetching app code, running an app's lifecycle procedures, the reroute
//! pass, and host compatibility shims.

pub mod application;
pub mod loader;
pub mod lifecycle;
pub mod reroute;
pub mod compat;

pub use self::application::Application;
pub use self::loader::Loader;
pub use self::lifecycle::LifecycleExecutor;
pub use self::reroute::RerouteTrigger;
pub use self::compat::CompatibilityShim;
