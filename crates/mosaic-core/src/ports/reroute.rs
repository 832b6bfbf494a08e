//! RerouteTrigger port - 再評価パスの起動

/// Starts one re-evaluation pass (partition + load/mount/unmount).
///
/// Called after every successful registration and after every settled
/// immediate unload. Must be re-entrant and must not block: implementations
/// usually just enqueue a request for the host loop.
pub trait RerouteTrigger: Send + Sync {
    fn reroute(&self);
}
