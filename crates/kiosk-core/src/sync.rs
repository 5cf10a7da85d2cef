// Staleness polling and dataset refetch.
//
// Two independent loops ask the server for its change stamps on a fixed
// interval. A changed database stamp (including the very first one) makes the
// `RefetchCoordinator` download the whole dataset and install it in the
// `SnapshotStore`. A changed client-build stamp asks the front end to restart,
// except on the first observation, which only seeds the baseline.
//
// Every failure here is logged and dropped. A dataset fetch that still fails
// after its retries is attempted again on the next tick, even when the
// database stamp did not move.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::{ApiError, CheckinApi};
use crate::config::PollingConfig;
use crate::protocol::SyncEvent;
use crate::store::SnapshotStore;

// ---------------------------------------------------------------------------
// Version markers
// ---------------------------------------------------------------------------

/// Last observed database stamp. Owned by the data poller.
#[derive(Debug, Default, Clone)]
pub struct DataMarker {
    last: Option<String>,
}

impl DataMarker {
    /// Record `token`; returns `true` when the dataset must be refetched.
    ///
    /// The transition from "never observed" to any value counts as a change,
    /// so the first successful ping always loads the dataset.
    pub fn observe(&mut self, token: &str) -> bool {
        if self.last.as_deref() == Some(token) {
            return false;
        }
        self.last = Some(token.to_string());
        true
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// Last observed client-build stamp. Owned by the assets poller.
#[derive(Debug, Default, Clone)]
pub struct AssetsMarker {
    last: Option<String>,
}

impl AssetsMarker {
    /// Record `token`; returns `true` when the client should reload.
    ///
    /// Only a change away from a previously seen, non-empty stamp counts.
    pub fn observe(&mut self, token: &str) -> bool {
        let reload = match self.last.as_deref() {
            Some(prev) if !prev.is_empty() => prev != token,
            _ => false,
        };
        self.last = Some(token.to_string());
        reload
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded retry with linear backoff: the pause before retry `n` is
/// `n * backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds or `policy.attempts` calls have failed.
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                debug!(attempt, attempts, "{what} failed, retrying: {e}");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Refetch coordinator
// ---------------------------------------------------------------------------

/// Downloads the full dataset on demand and installs it in the store.
///
/// A new trigger cancels the fetch that is still in flight, and a fetch only
/// installs its result if no newer trigger happened in the meantime, so the
/// store always ends up with the response to the most recent trigger.
pub struct RefetchCoordinator {
    api: Arc<dyn CheckinApi>,
    store: Arc<SnapshotStore>,
    events: mpsc::Sender<SyncEvent>,
    /// Monotonically increasing fetch counter. Results from older fetches
    /// are discarded.
    latest: Arc<AtomicU64>,
    /// Set when the most recent fetch gave up.
    failed: Arc<AtomicBool>,
    retry: RetryPolicy,
    in_flight: Option<JoinHandle<()>>,
}

impl RefetchCoordinator {
    pub fn new(
        api: Arc<dyn CheckinApi>,
        store: Arc<SnapshotStore>,
        events: mpsc::Sender<SyncEvent>,
    ) -> Self {
        Self {
            api,
            store,
            events,
            latest: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicBool::new(false)),
            retry: RetryPolicy::none(),
            in_flight: None,
        }
    }

    /// Retry each dataset download according to `retry`.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start a new dataset fetch, superseding any fetch still running.
    pub fn trigger(&mut self) {
        self.cancel();

        let fetch = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let latest = Arc::clone(&self.latest);
        let failed = Arc::clone(&self.failed);
        let events = self.events.clone();
        let retry = self.retry;
        self.failed.store(false, Ordering::SeqCst);

        self.in_flight = Some(tokio::spawn(async move {
            let client = api.as_ref();
            match with_retry(retry, "dataset fetch", || client.fetch_dataset()).await {
                Ok(snapshot) => {
                    if latest.load(Ordering::SeqCst) != fetch {
                        debug!(fetch, "discarding superseded dataset");
                        return;
                    }
                    let generation = store.replace(snapshot);
                    info!(fetch, generation, "dataset refreshed");
                    let _ = events.send(SyncEvent::SnapshotReplaced { generation }).await;
                }
                Err(e) => {
                    warn!(fetch, "dataset fetch failed: {e}");
                    if latest.load(Ordering::SeqCst) == fetch {
                        failed.store(true, Ordering::SeqCst);
                    }
                }
            }
        }));
        debug!(fetch, "dataset fetch started");
    }

    /// Abort the in-flight fetch, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                handle.abort();
                debug!("cancelled superseded dataset fetch");
            }
        }
    }

    /// Whether the most recent fetch gave up without installing anything.
    pub fn last_fetch_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether a fetch is still running.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RefetchCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Pollers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub interval: Duration,
    pub retry: RetryPolicy,
}

impl SyncSettings {
    pub fn from_config(polling: &PollingConfig) -> Self {
        SyncSettings {
            interval: polling.interval(),
            retry: RetryPolicy {
                attempts: polling.retry_attempts,
                backoff: polling.retry_backoff(),
            },
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run_data_poller(
    api: Arc<dyn CheckinApi>,
    mut coordinator: RefetchCoordinator,
    settings: SyncSettings,
) {
    let mut marker = DataMarker::default();
    let mut ticks = ticker(settings.interval);
    loop {
        ticks.tick().await;
        let client = api.as_ref();
        match with_retry(settings.retry, "data version ping", || client.data_version()).await {
            Ok(token) => {
                if marker.observe(&token) {
                    info!(token = %token, "data version changed, refetching");
                    coordinator.trigger();
                } else if coordinator.last_fetch_failed() {
                    info!(token = %token, "previous dataset fetch failed, refetching");
                    coordinator.trigger();
                }
            }
            Err(e) => warn!("data version ping failed: {e}"),
        }
    }
}

async fn run_assets_poller(
    api: Arc<dyn CheckinApi>,
    events: mpsc::Sender<SyncEvent>,
    settings: SyncSettings,
) {
    let mut marker = AssetsMarker::default();
    let mut ticks = ticker(settings.interval);
    loop {
        ticks.tick().await;
        let client = api.as_ref();
        match with_retry(settings.retry, "assets version ping", || client.assets_version()).await {
            Ok(token) => {
                if marker.observe(&token) {
                    info!(token = %token, "client build changed, requesting reload");
                    if events.send(SyncEvent::ReloadRequested).await.is_err() {
                        debug!("sync event receiver dropped, assets poller exiting");
                        return;
                    }
                }
            }
            Err(e) => warn!("assets version ping failed: {e}"),
        }
    }
}

/// Owns the two polling tasks. Dropping it (or calling [`shutdown`]) stops
/// both pollers and any dataset fetch still in flight.
///
/// [`shutdown`]: SyncService::shutdown
pub struct SyncService {
    data_task: JoinHandle<()>,
    assets_task: JoinHandle<()>,
}

impl SyncService {
    /// Spawn the data and assets pollers on the current tokio runtime.
    pub fn start(
        api: Arc<dyn CheckinApi>,
        store: Arc<SnapshotStore>,
        settings: SyncSettings,
        events: mpsc::Sender<SyncEvent>,
    ) -> Self {
        info!(
            interval_ms = settings.interval.as_millis() as u64,
            retry_attempts = settings.retry.attempts,
            "starting sync pollers"
        );
        let coordinator = RefetchCoordinator::new(Arc::clone(&api), store, events.clone())
            .with_retry_policy(settings.retry);
        let data_task = tokio::spawn(run_data_poller(Arc::clone(&api), coordinator, settings));
        let assets_task = tokio::spawn(run_assets_poller(api, events, settings));
        Self {
            data_task,
            assets_task,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.data_task.is_finished() || !self.assets_task.is_finished()
    }

    /// Stop both pollers.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.data_task.abort();
        self.assets_task.abort();
        debug!("sync pollers stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
