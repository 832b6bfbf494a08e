//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no config at all)
//! gives the standard behaviour.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trigger a reroute pass after every successful registration.
    pub reroute_on_register: bool,

    /// Trigger a (deferred) reroute pass after every successful immediate unload.
    pub reroute_after_unload: bool,

    /// Emit a warning when a deprecated alias is called.
    pub warn_on_deprecated: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reroute_on_register: true,
            reroute_after_unload: true,
            warn_on_deprecated: true,
        }
    }
}

impl EngineConfig {
    /// JSON 文字列から読み込む（欠けたフィールドはデフォルト）
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
