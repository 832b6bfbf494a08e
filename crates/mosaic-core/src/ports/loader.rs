//! Loader port - アプリ実装の取得（動的 import）の抽象化

use std::sync::Arc;

use async_trait::async_trait;

use super::Application;
use crate::error::LifecycleError;

/// Global fallback loader.
///
/// Only consulted for apps registered without their own loader
/// (`AppSource::GlobalLoader`). The name is the only input.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn import(&self, name: &str) -> Result<Arc<dyn Application>, LifecycleError>;
}
