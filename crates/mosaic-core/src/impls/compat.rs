//! NoopCompat - 何もしない互換レイヤー

use crate::ports::CompatibilityShim;

/// Default shim for hosts that need no compatibility support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompat;

impl CompatibilityShim for NoopCompat {
    fn ensure_support(&self) {}
}
