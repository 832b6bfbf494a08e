//! Impls - 実装（開発用・テスト用）
//!
//! In-process implementations of the ports. Production hosts supply their
//! own reroute loop and lifecycle executor.
//!
//! # 含まれる実装
//! - **ChannelReroute**: reroute 要求を mpsc でホストへ送る
//! - **NoopCompat**: 何もしない互換レイヤー
//! - **LocalExecutor**: in-process のライフサイクル実行器 + 参照用 reroute パス

pub mod compat;
pub mod executor;
pub mod reroute;

pub use self::compat::NoopCompat;
pub use self::executor::LocalExecutor;
pub use self::reroute::ChannelReroute;
