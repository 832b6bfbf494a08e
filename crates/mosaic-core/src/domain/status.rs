//! Application status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one registered application.
///
/// Typical transitions (driven by the external lifecycle executor):
/// - NotLoaded -> LoadingSourceCode -> NotBootstrapped -> Bootstrapping -> NotMounted
/// - NotMounted -> Mounting -> Mounted -> Unmounting -> NotMounted
/// - NotMounted -> Unloading -> NotLoaded (only after an explicit unload)
/// - any -> SkipBecauseBroken (a lifecycle procedure failed)
///
/// The core only reads the predicates below; it never writes intermediate
/// states itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    NotLoaded,
    LoadingSourceCode,
    NotBootstrapped,
    Bootstrapping,
    NotMounted,
    Mounting,
    Mounted,
    Unmounting,
    Unloading,
    SkipBecauseBroken,
}

impl AppStatus {
    pub const ALL: [AppStatus; 10] = [
        AppStatus::NotLoaded,
        AppStatus::LoadingSourceCode,
        AppStatus::NotBootstrapped,
        AppStatus::Bootstrapping,
        AppStatus::NotMounted,
        AppStatus::Mounting,
        AppStatus::Mounted,
        AppStatus::Unmounting,
        AppStatus::Unloading,
        AppStatus::SkipBecauseBroken,
    ];

    /// Active-by-status: currently mounted.
    pub fn is_active(self) -> bool {
        matches!(self, AppStatus::Mounted)
    }

    /// Has the implementation been fetched?
    pub fn is_loaded(self) -> bool {
        !matches!(self, AppStatus::NotLoaded | AppStatus::LoadingSourceCode)
    }

    /// Broken apps are ignored by every partition query.
    pub fn is_skipped(self) -> bool {
        matches!(self, AppStatus::SkipBecauseBroken)
    }

    /// ワイヤ表現（SCREAMING_SNAKE_CASE）
    pub fn as_str(self) -> &'static str {
        match self {
            AppStatus::NotLoaded => "NOT_LOADED",
            AppStatus::LoadingSourceCode => "LOADING_SOURCE_CODE",
            AppStatus::NotBootstrapped => "NOT_BOOTSTRAPPED",
            AppStatus::Bootstrapping => "BOOTSTRAPPING",
            AppStatus::NotMounted => "NOT_MOUNTED",
            AppStatus::Mounting => "MOUNTING",
            AppStatus::Mounted => "MOUNTED",
            AppStatus::Unmounting => "UNMOUNTING",
            AppStatus::Unloading => "UNLOADING",
            AppStatus::SkipBecauseBroken => "SKIP_BECAUSE_BROKEN",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
