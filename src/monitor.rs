//! Periodic provider health monitor

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::probe::Prober;
use crate::provider::{ProviderProbeTarget, StatusSnapshot, StatusSummary};
use crate::transport::HttpTransport;

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

/// What happened to a requested refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published
    Completed(StatusSummary),
    /// Another cycle was still in flight
    Skipped,
    /// The monitor was stopped before the result could be published
    Discarded,
    /// A probe task did not complete; the previous snapshot was kept
    Failed,
}

/// Owns the probe targets, the published snapshot and the refresh schedule
pub struct ProviderMonitor {
    inner: Arc<MonitorInner>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

struct MonitorInner {
    targets: Vec<ProviderProbeTarget>,
    prober: Prober,
    refresh_interval: Duration,
    board: watch::Sender<StatusSnapshot>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
}

/// Held for the duration of one cycle; releases the in-flight flag on drop
struct CycleGuard {
    inner: Arc<MonitorInner>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl MonitorInner {
    fn try_begin(self: &Arc<Self>) -> Option<CycleGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                inner: Arc::clone(self),
            })
    }

    #[instrument(skip(guard))]
    async fn run_cycle(guard: CycleGuard) -> RefreshOutcome {
        let inner = &guard.inner;

        if inner.disposed.load(Ordering::Acquire) {
            return RefreshOutcome::Discarded;
        }

        let handles: Vec<JoinHandle<_>> = inner
            .targets
            .iter()
            .map(|target| {
                let prober = inner.prober.clone();
                let target = target.clone();
                tokio::spawn(async move {
                    let mut status = prober
                        .probe_endpoint(target.base_url.as_deref(), &target.name)
                        .await;
                    status.enabled = target.enabled;
                    status
                })
            })
            .collect();

        let mut statuses = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            match joined {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    error!("Provider probe task failed, keeping previous statuses: {}", e);
                    return RefreshOutcome::Failed;
                }
            }
        }

        if inner.disposed.load(Ordering::Acquire) {
            debug!("Monitor stopped during refresh, discarding results");
            return RefreshOutcome::Discarded;
        }

        let snapshot = StatusSnapshot::completed(statuses);
        let summary = snapshot.summary();
        info!("Provider status refresh complete: {}", summary);
        inner.board.send_replace(snapshot);

        RefreshOutcome::Completed(summary)
    }
}

impl ProviderMonitor {
    pub fn new(
        targets: Vec<ProviderProbeTarget>,
        prober: Prober,
        refresh_interval: Duration,
    ) -> Self {
        let (board, _) = watch::channel(StatusSnapshot::pending(&targets));

        Self {
            inner: Arc::new(MonitorInner {
                targets,
                prober,
                refresh_interval,
                board,
                in_flight: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Build a monitor with the HTTP transport from validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let transport = Arc::new(HttpTransport::new()?);
        let prober = Prober::new(transport, config.probe_timeout);

        Ok(Self::new(
            config.providers.clone(),
            prober,
            config.refresh_interval,
        ))
    }

    /// Latest complete snapshot (pending placeholders before the first cycle)
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.board.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.board.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Probe every target concurrently and publish the joined result.
    pub async fn refresh_all_statuses(&self) -> RefreshOutcome {
        match self.inner.try_begin() {
            Some(guard) => MonitorInner::run_cycle(guard).await,
            None => {
                debug!("Refresh requested while a cycle is in flight, skipping");
                RefreshOutcome::Skipped
            }
        }
    }

    /// Start a cycle in the background. Returns false when one is already running.
    pub fn trigger_refresh(&self) -> bool {
        match self.inner.try_begin() {
            Some(guard) => {
                tokio::spawn(MonitorInner::run_cycle(guard));
                true
            }
            None => {
                debug!("Refresh requested while a cycle is in flight, skipping");
                false
            }
        }
    }

    /// Run a cycle now and then once per refresh interval until stopped
    pub fn start(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(MonitorError::Other("monitor has been stopped".to_string()));
        }

        let mut scheduler = self
            .scheduler
            .lock()
            .map_err(|_| MonitorError::Other("scheduler lock poisoned".to_string()))?;

        if scheduler.is_some() {
            warn!("Provider monitor already started");
            return Ok(());
        }

        info!(
            "Starting provider monitor for {} targets, refreshing every {}s",
            self.inner.targets.len(),
            self.inner.refresh_interval.as_secs()
        );

        let inner = Arc::clone(&self.inner);
        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = interval(inner.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                match inner.try_begin() {
                    Some(guard) => {
                        tokio::spawn(MonitorInner::run_cycle(guard));
                    }
                    None => debug!("Previous refresh still in flight, skipping tick"),
                }
            }
        }));

        Ok(())
    }

    /// Cancel the schedule. An in-flight cycle finishes but is not published.
    pub fn stop(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Ok(mut scheduler) = self.scheduler.lock() {
            if let Some(handle) = scheduler.take() {
                handle.abort();
            }
        }

        info!("Provider monitor stopped");
    }
}

impl Drop for ProviderMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
