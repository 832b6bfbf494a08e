//! Application port - 登録されたアプリが公開するライフサイクル手続き
//!
//! The core never calls these itself. They are what a loader resolves to
//! and what a lifecycle executor drives.

use async_trait::async_trait;

use crate::domain::CustomProps;
use crate::error::LifecycleError;

/// Exported lifecycle procedures of one application implementation.
///
/// # 使用例
/// ```ignore
/// struct Navbar;
///
/// #[async_trait]
/// impl Application for Navbar {
///     async fn mount(&self, _props: &CustomProps) -> Result<(), LifecycleError> { Ok(()) }
///     async fn unmount(&self, _props: &CustomProps) -> Result<(), LifecycleError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Application: Send + Sync {
    async fn bootstrap(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
        Ok(())
    }

    async fn mount(&self, props: &CustomProps) -> Result<(), LifecycleError>;

    async fn unmount(&self, props: &CustomProps) -> Result<(), LifecycleError>;

    /// Optional. Apps without an unload step are simply forgotten.
    async fn unload(&self, _props: &CustomProps) -> Result<(), LifecycleError> {
        Ok(())
    }
}
