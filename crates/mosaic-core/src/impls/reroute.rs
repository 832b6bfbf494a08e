//! ChannelReroute - reroute 要求をホストのループへ送る
//!
//! `reroute()` must not block and may be called re-entrantly, so this
//! implementation only enqueues a unit message; the host drains the
//! receiver and runs one pass per message (or coalesces them).

use tokio::sync::mpsc;
use tracing::debug;

use crate::ports::RerouteTrigger;

#[derive(Debug, Clone)]
pub struct ChannelReroute {
    tx: mpsc::UnboundedSender<()>,
}

impl ChannelReroute {
    /// トリガーと受信側を作成
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RerouteTrigger for ChannelReroute {
    fn reroute(&self) {
        if self.tx.send(()).is_err() {
            debug!("reroute requested but the host loop is gone");
        }
    }
}
