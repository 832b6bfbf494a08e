//! LifecycleExecutor port - unmount / unload 手続きの抽象化
//!
//! The unload coordinator sequences these two calls. Status bookkeeping
//! (UNMOUNTING, NOT_MOUNTED, UNLOADING, NOT_LOADED, ...) is the executor's job.

use async_trait::async_trait;

use crate::domain::AppInfo;
use crate::error::LifecycleError;

#[async_trait]
pub trait LifecycleExecutor: Send + Sync {
    /// Must be safe to call on an app that is not mounted (no-op).
    async fn unmount(&self, app: &AppInfo) -> Result<(), LifecycleError>;

    /// Only called after `unmount` completed.
    async fn unload(&self, app: &AppInfo) -> Result<(), LifecycleError>;
}
