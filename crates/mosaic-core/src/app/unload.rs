//! UnloadCoordinator - unload 要求の重複排除と unmount→unload の順序付け
//!
//! At most one request record exists per app name. Every caller asking for
//! the same app while a record is open receives a clone of the same
//! [`UnloadHandle`], and that handle settles exactly once.
//!
//! ```text
//! IDLE ──unload_application──► PENDING ──settle (Ok | Err)──► IDLE
//!            (record created)     │  joins reuse the record
//!                                 └─ immediate mode marks it in flight
//! ```
//!
//! # Modes
//! - **wait for unmount**: create or join the record, schedule nothing. The
//!   record is settled later by whoever unloads the app (an immediate unload,
//!   or the executor's reroute pass through [`UnloadCoordinator::complete_unload`]).
//! - **immediate**: create or adopt the record and run unmount → unload now.
//!   If a sequence is already in flight for that record, just join it.
//!
//! After a successful immediate sequence a reroute is requested from a
//! separately spawned task, so it runs in a later scheduling turn than the
//! handle's resolution.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::registry::Registry;
use crate::domain::AppInfo;
use crate::error::{EngineError, LifecycleError, UnloadError};
use crate::ports::{LifecycleExecutor, RerouteTrigger};

type Settlement = Result<(), UnloadError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadOptions {
    /// Wait for the app to be unmounted by someone else instead of forcing it.
    #[serde(default)]
    pub wait_for_unmount: bool,
}

impl UnloadOptions {
    /// 今すぐ unmount → unload を実行
    pub fn immediate() -> Self {
        Self {
            wait_for_unmount: false,
        }
    }

    /// 他の誰かが unmount するまで待つ
    pub fn wait_for_unmount() -> Self {
        Self {
            wait_for_unmount: true,
        }
    }
}

/// Completion handle shared by every caller attached to one request record.
#[derive(Clone)]
pub struct UnloadHandle {
    inner: Shared<BoxFuture<'static, Settlement>>,
}

impl UnloadHandle {
    fn new(app: String, rx: oneshot::Receiver<Settlement>) -> Self {
        let fut = rx
            .map(move |received| received.unwrap_or(Err(UnloadError::Abandoned { app })))
            .boxed();
        Self { inner: fut.shared() }
    }

    /// Whether both handles belong to the same request.
    ///
    /// Only meaningful before either of them has been awaited to completion.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// The outcome if the request has already settled, without waiting.
    pub fn peek(&self) -> Option<Settlement> {
        self.clone().now_or_never()
    }
}

impl Future for UnloadHandle {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

struct UnloadRecord {
    id: Ulid,
    handle: UnloadHandle,
    resolve: oneshot::Sender<Settlement>,
    /// An immediate unmount → unload sequence is running for this record.
    in_flight: bool,
}

impl UnloadRecord {
    fn new(app: &str) -> Self {
        let (resolve, rx) = oneshot::channel();
        Self {
            id: Ulid::new(),
            handle: UnloadHandle::new(app.to_string(), rx),
            resolve,
            in_flight: false,
        }
    }
}

type RecordMap = Mutex<HashMap<String, UnloadRecord>>;

fn lock(records: &RecordMap) -> MutexGuard<'_, HashMap<String, UnloadRecord>> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remove the record (only the one with `id`, when given) and deliver the
/// outcome. Returns `false` when there was nothing to settle.
fn settle(records: &RecordMap, app: &str, id: Option<Ulid>, outcome: Settlement) -> bool {
    let record = {
        let mut map = lock(records);
        match map.get(app) {
            Some(record) if id.is_none_or(|id| record.id == id) => map.remove(app),
            _ => None,
        }
    };
    let Some(record) = record else {
        return false;
    };
    debug!(app, request = %record.id, ok = outcome.is_ok(), "unload request settled");
    // nobody listening any more is fine
    let _ = record.resolve.send(outcome);
    true
}

pub struct UnloadCoordinator<C> {
    registry: Arc<Registry<C>>,
    executor: Arc<dyn LifecycleExecutor>,
    reroute: Arc<dyn RerouteTrigger>,
    records: Arc<RecordMap>,
    reroute_after_unload: bool,
}

impl<C: 'static> UnloadCoordinator<C> {
    pub fn new(
        registry: Arc<Registry<C>>,
        executor: Arc<dyn LifecycleExecutor>,
        reroute: Arc<dyn RerouteTrigger>,
    ) -> Self {
        Self {
            registry,
            executor,
            reroute,
            records: Arc::new(Mutex::new(HashMap::new())),
            reroute_after_unload: true,
        }
    }

    /// unload 成功後の reroute を有効 / 無効にする
    pub fn with_reroute_after_unload(mut self, enabled: bool) -> Self {
        self.reroute_after_unload = enabled;
        self
    }

    /// Request that `name` be unloaded.
    ///
    /// Validation errors are returned immediately; lifecycle failures arrive
    /// through the returned handle. Immediate mode must be called from within
    /// a tokio runtime.
    pub fn unload_application(
        &self,
        name: &str,
        options: UnloadOptions,
    ) -> Result<UnloadHandle, EngineError> {
        let app = self.registry.find_by_name(name).ok_or_else(|| {
            EngineError::NotFound(name.to_string())
        })?;

        if options.wait_for_unmount {
            let mut records = lock(&self.records);
            if let Some(record) = records.get(name) {
                debug!(app = name, request = %record.id, "joining pending unload");
                return Ok(record.handle.clone());
            }
            let record = UnloadRecord::new(name);
            let handle = record.handle.clone();
            debug!(app = name, request = %record.id, "waiting for unmount before unloading");
            records.insert(name.to_string(), record);
            return Ok(handle);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            EngineError::Configuration("immediate unload requires a tokio runtime".to_string())
        })?;

        let (handle, id) = {
            let mut records = lock(&self.records);
            let record = records
                .entry(name.to_string())
                .or_insert_with(|| UnloadRecord::new(name));
            if record.in_flight {
                debug!(app = name, request = %record.id, "unload already in flight, joining");
                return Ok(record.handle.clone());
            }
            record.in_flight = true;
            (record.handle.clone(), record.id)
        };

        info!(app = name, request = %id, "unloading application");
        let sequence = run_sequence(
            app.info(),
            id,
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
            Arc::clone(&self.reroute),
            Arc::clone(&self.records),
            self.reroute_after_unload,
        );
        let records = Arc::clone(&self.records);
        let app_name = name.to_string();
        runtime.spawn(async move {
            if AssertUnwindSafe(sequence).catch_unwind().await.is_err() {
                warn!(app = %app_name, request = %id, "unload sequence panicked");
                let err = LifecycleError::new(&app_name, "lifecycle procedure panicked");
                settle(&records, &app_name, Some(id), Err(UnloadError::Lifecycle(err)));
            }
        });
        Ok(handle)
    }

    /// Settle the open request for `name` with the outcome of an unload that
    /// happened elsewhere (typically the executor's reroute pass).
    ///
    /// Returns `false` when no request was open, or when an immediate
    /// sequence owns it; that sequence settles it itself.
    pub fn complete_unload(&self, name: &str, result: Result<(), LifecycleError>) -> bool {
        let id = match lock(&self.records).get(name) {
            Some(record) if !record.in_flight => record.id,
            Some(record) => {
                debug!(app = name, request = %record.id, "unload in flight, not completing from outside");
                return false;
            }
            None => return false,
        };
        settle(&self.records, name, Some(id), result.map_err(UnloadError::from))
    }

    /// 未完了の unload 要求があるか
    pub fn has_pending(&self, name: &str) -> bool {
        lock(&self.records).contains_key(name)
    }

    /// Names with an open request, sorted.
    pub fn pending_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.records).keys().cloned().collect();
        names.sort();
        names
    }

    /// Names with an open request that no immediate sequence is working on,
    /// sorted. Only these may be unloaded by a reroute pass.
    pub fn unloadable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.records)
            .iter()
            .filter(|(_, record)| !record.in_flight)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

async fn run_sequence<C: 'static>(
    info: AppInfo,
    id: Ulid,
    registry: Arc<Registry<C>>,
    executor: Arc<dyn LifecycleExecutor>,
    reroute: Arc<dyn RerouteTrigger>,
    records: Arc<RecordMap>,
    reroute_after_unload: bool,
) {
    let name = info.name.clone();
    let unmounted = executor.unmount(&info).await;
    let result = match unmounted {
        Ok(()) => {
            // status moved during unmount; hand the unload step a fresh view
            let info = registry
                .find_by_name(&name)
                .map(|app| app.info())
                .unwrap_or(info);
            executor.unload(&info).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            settle(&records, &name, Some(id), Ok(()));
            info!(app = %name, request = %id, "application unloaded");
            if reroute_after_unload {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    reroute.reroute();
                });
            }
        }
        Err(err) => {
            warn!(app = %name, request = %id, error = %err, "unload failed");
            settle(&records, &name, Some(id), Err(UnloadError::Lifecycle(err)));
        }
    }
}
