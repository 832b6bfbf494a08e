//! CompatibilityShim port - 互換レイヤーの確認

/// Side-effect-only hook run once per registration (e.g. install a legacy
/// query shim in the host). No return contract is relied upon.
pub trait CompatibilityShim: Send + Sync {
    fn ensure_support(&self);
}
