//! Activity evaluation and work-set partitioning.
//!
//! All functions here are pure reads over a registry snapshot. Activity
//! predicates are evaluated against the routing context the caller passes
//! and are never cached between calls.

use serde::Serialize;

use super::registry::Registry;
use crate::domain::{AppRecord, AppStatus};

/// Names whose predicate holds for `ctx`, in registration order.
pub fn check_activity_functions<C>(registry: &Registry<C>, ctx: &C) -> Vec<String> {
    registry
        .snapshot()
        .into_iter()
        .filter(|app| app.should_be_active(ctx))
        .map(|app| app.name)
        .collect()
}

/// Not skipped, not loaded, should be active.
pub fn apps_to_load<C>(registry: &Registry<C>, ctx: &C) -> Vec<AppRecord<C>> {
    registry
        .snapshot()
        .into_iter()
        .filter(|app| wants_load(app.status, app.should_be_active(ctx)))
        .collect()
}

/// Not skipped, mounted, should no longer be active.
pub fn apps_to_unmount<C>(registry: &Registry<C>, ctx: &C) -> Vec<AppRecord<C>> {
    registry
        .snapshot()
        .into_iter()
        .filter(|app| wants_unmount(app.status, app.should_be_active(ctx)))
        .collect()
}

/// Not skipped, not mounted, loaded, should be active.
pub fn apps_to_mount<C>(registry: &Registry<C>, ctx: &C) -> Vec<AppRecord<C>> {
    registry
        .snapshot()
        .into_iter()
        .filter(|app| wants_mount(app.status, app.should_be_active(ctx)))
        .collect()
}

/// Apps with an outstanding unload request that are settled out of the
/// mounted states (NOT_BOOTSTRAPPED, NOT_MOUNTED or NOT_LOADED).
///
/// `pending` is the coordinator's list of names whose request may be
/// completed by a reroute pass.
pub fn apps_to_unload<C>(registry: &Registry<C>, pending: &[String]) -> Vec<AppRecord<C>> {
    registry
        .snapshot()
        .into_iter()
        .filter(|app| wants_unload(app.status, pending.contains(&app.name)))
        .collect()
}

// Each filter below reads the status once and the activity once, which is
// what keeps the sets disjoint: load needs !loaded, mount needs loaded,
// unmount needs active, mount needs !active.

fn wants_load(status: AppStatus, should_be_active: bool) -> bool {
    !status.is_skipped() && !status.is_loaded() && should_be_active
}

fn wants_unmount(status: AppStatus, should_be_active: bool) -> bool {
    !status.is_skipped() && status.is_active() && !should_be_active
}

fn wants_mount(status: AppStatus, should_be_active: bool) -> bool {
    !status.is_skipped() && !status.is_active() && status.is_loaded() && should_be_active
}

fn wants_unload(status: AppStatus, pending: bool) -> bool {
    pending
        && matches!(
            status,
            AppStatus::NotBootstrapped | AppStatus::NotMounted | AppStatus::NotLoaded
        )
}

/// The four work sets of one reroute pass, computed from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub to_load: Vec<String>,
    pub to_mount: Vec<String>,
    pub to_unmount: Vec<String>,
    pub to_unload: Vec<String>,
}

impl Partition {
    /// Take one snapshot and evaluate each predicate exactly once.
    pub fn compute<C>(registry: &Registry<C>, ctx: &C, pending: &[String]) -> Self {
        let mut partition = Partition::default();
        for app in registry.snapshot() {
            let active = app.should_be_active(ctx);
            if wants_load(app.status, active) {
                partition.to_load.push(app.name.clone());
            } else if wants_mount(app.status, active) {
                partition.to_mount.push(app.name.clone());
            } else if wants_unmount(app.status, active) {
                partition.to_unmount.push(app.name.clone());
            }
            if wants_unload(app.status, pending.contains(&app.name)) {
                partition.to_unload.push(app.name);
            }
        }
        partition
    }

    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty()
            && self.to_mount.is_empty()
            && self.to_unmount.is_empty()
            && self.to_unload.is_empty()
    }
}
