//! Status - 状態ごとのアプリ数（観測用ビュー）

use serde::{Deserialize, Serialize};

use crate::domain::{AppRecord, AppStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_loaded: usize,
    pub loading: usize,
    pub bootstrapping: usize,
    pub not_mounted: usize,
    pub mounted: usize,
    pub transitioning: usize,
    pub broken: usize,
}

impl StatusCounts {
    /// スナップショットから集計
    pub fn from_records<C>(records: &[AppRecord<C>]) -> Self {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.status {
                AppStatus::NotLoaded => counts.not_loaded += 1,
                AppStatus::LoadingSourceCode => counts.loading += 1,
                AppStatus::NotBootstrapped | AppStatus::Bootstrapping => counts.bootstrapping += 1,
                AppStatus::NotMounted => counts.not_mounted += 1,
                AppStatus::Mounted => counts.mounted += 1,
                AppStatus::Mounting | AppStatus::Unmounting | AppStatus::Unloading => {
                    counts.transitioning += 1
                }
                AppStatus::SkipBecauseBroken => counts.broken += 1,
            }
        }
        counts
    }

    /// 合計件数
    pub fn total(&self) -> usize {
        self.not_loaded
            + self.loading
            + self.bootstrapping
            + self.not_mounted
            + self.mounted
            + self.transitioning
            + self.broken
    }
}
