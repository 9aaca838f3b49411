//! Polling refresh controller
//!
//! Keeps the dashboard's displayed data reasonably fresh without unbounded
//! retry against a failing backend. Each tick fans out every configured
//! fetch concurrently, waits for all of them to settle, then applies the
//! successful results in one pass with no suspension between slice writes.
//! A slice whose fetch failed keeps its previous value. After a configured
//! number of consecutive failed cycles the controller pauses itself and
//! emits a single notice; only constructing a fresh controller resumes
//! polling.
//!
//! The first cycle runs immediately on `start`, not after one interval.
//! `stop` cancels the timer, not in-flight requests: fetches already issued
//! run to completion and their results are discarded.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::client::FetchError;
use crate::notice::{Notice, NoticeBroadcaster};

/// Errors from the controller's own contract; fetch failures are not
/// errors here, they are per-operation outcomes
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("at least one poll operation is required")]
    NoOperations,

    #[error("controller is not idle")]
    NotIdle,
}

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Polling = 1,
    Paused = 2,
}

fn phase_from_u8(raw: u8) -> Phase {
    match raw {
        1 => Phase::Polling,
        2 => Phase::Paused,
        _ => Phase::Idle,
    }
}

/// Deferred write of exactly one view slice, produced by a successful fetch
/// and applied only after the whole cycle has settled
pub struct SliceUpdate<S>(Box<dyn FnOnce(&mut S) + Send>);

impl<S> SliceUpdate<S> {
    pub fn new<F>(apply: F) -> Self
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        Self(Box::new(apply))
    }

    fn apply(self, state: &mut S) {
        (self.0)(state);
    }
}

/// One named asynchronous fetch paired with the typed setter for the slice
/// it owns. Dispatch is by name, never by position.
pub struct PollOperation<S> {
    name: &'static str,
    fetch: Arc<dyn Fn() -> BoxFuture<'static, Result<SliceUpdate<S>, FetchError>> + Send + Sync>,
}

impl<S> Clone for PollOperation<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<S> PollOperation<S> {
    pub fn new<F, Fut>(name: &'static str, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SliceUpdate<S>, FetchError>> + Send + 'static,
    {
        let fetch = move || -> BoxFuture<'static, Result<SliceUpdate<S>, FetchError>> {
            Box::pin(fetch())
        };
        Self {
            name,
            fetch: Arc::new(fetch),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Flags shared between the controller handle and its timer task
struct Shared {
    phase: AtomicU8,
    streak: AtomicU32,
    loading: AtomicBool,
    alive: AtomicBool,
}

/// Owns the repeating timer for one view's refresh loop
///
/// The controller is the only writer of its state cell; HTTP handlers read
/// snapshots. Dropping the controller stops the timer.
pub struct RefreshController<S> {
    state: Arc<RwLock<S>>,
    notices: NoticeBroadcaster,
    failure_threshold: u32,
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<S> RefreshController<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(initial: S, notices: NoticeBroadcaster, failure_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            notices,
            failure_threshold,
            shared: Arc::new(Shared {
                phase: AtomicU8::new(Phase::Idle as u8),
                streak: AtomicU32::new(0),
                loading: AtomicBool::new(true),
                alive: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Register the repeating trigger and run the first cycle immediately
    pub fn start(
        &self,
        interval: Duration,
        operations: Vec<PollOperation<S>>,
    ) -> Result<(), PollerError> {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }
        if operations.is_empty() {
            return Err(PollerError::NoOperations);
        }
        self.shared
            .phase
            .compare_exchange(
                Phase::Idle as u8,
                Phase::Polling as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| PollerError::NotIdle)?;

        self.shared.streak.store(0, Ordering::SeqCst);
        self.shared.alive.store(true, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let shared = Arc::clone(&self.shared);
        let notices = self.notices.clone();
        let threshold = self.failure_threshold;

        let handle = tokio::spawn(async move {
            // First tick of a tokio interval fires immediately
            let mut ticker = time::interval(interval);
            info!(
                interval_secs = interval.as_secs(),
                operations = operations.len(),
                "polling started"
            );

            loop {
                ticker.tick().await;
                let clean = run_cycle(&operations, &state, &shared).await;
                if !shared.alive.load(Ordering::SeqCst) {
                    break;
                }
                if clean {
                    shared.streak.store(0, Ordering::SeqCst);
                } else {
                    let streak = shared.streak.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(streak, "cycle contained at least one failed operation");
                    if streak >= threshold {
                        shared.phase.store(Phase::Paused as u8, Ordering::SeqCst);
                        warn!(
                            streak,
                            "automatic refresh paused after consecutive failed cycles"
                        );
                        notices.broadcast_lossy(Notice::refresh_paused(streak));
                        break;
                    }
                }
            }
        });

        *lock_timer(&self.timer) = Some(handle);
        Ok(())
    }

    /// Cancel the repeating trigger. Idempotent; safe in any phase.
    ///
    /// In-flight fetches are not cancelled; their eventual results are
    /// discarded.
    pub fn stop(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = lock_timer(&self.timer).take() {
            handle.abort();
            info!("polling stopped");
        }
        self.shared.phase.store(Phase::Idle as u8, Ordering::SeqCst);
    }

    pub fn phase(&self) -> Phase {
        phase_from_u8(self.shared.phase.load(Ordering::SeqCst))
    }

    /// Consecutive cycles that contained at least one failed operation
    pub fn failure_streak(&self) -> u32 {
        self.shared.streak.load(Ordering::SeqCst)
    }

    /// True only until the first cycle has fully settled; later cycles are
    /// silent background refreshes
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &Arc<RwLock<S>> {
        &self.state
    }
}

impl<S> RefreshController<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub async fn snapshot(&self) -> S {
        self.state.read().await.clone()
    }
}

impl<S> Drop for RefreshController<S> {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = lock_timer(&self.timer).take() {
            handle.abort();
        }
    }
}

/// Fan out all operations, wait for every one to settle, then apply the
/// successful results under a single write guard. Returns true when the
/// cycle had zero failures.
async fn run_cycle<S>(
    operations: &[PollOperation<S>],
    state: &Arc<RwLock<S>>,
    shared: &Arc<Shared>,
) -> bool
where
    S: Send + Sync + 'static,
{
    // Each fetch runs as its own task so an aborted timer never cancels an
    // already-issued request
    let names: Vec<&'static str> = operations.iter().map(|op| op.name).collect();
    let tasks: Vec<JoinHandle<Result<SliceUpdate<S>, FetchError>>> = operations
        .iter()
        .map(|op| tokio::spawn((op.fetch)()))
        .collect();

    let settled = join_all(tasks).await;

    let mut updates: Vec<(&'static str, SliceUpdate<S>)> = Vec::new();
    let mut failed = 0usize;
    for (name, outcome) in names.into_iter().zip(settled) {
        match outcome {
            Ok(Ok(update)) => updates.push((name, update)),
            Ok(Err(err)) => {
                failed += 1;
                warn!(operation = name, error = %err, "fetch failed; keeping previous value");
            }
            Err(err) => {
                failed += 1;
                warn!(operation = name, error = %err, "fetch task did not complete");
            }
        }
    }

    if shared.alive.load(Ordering::SeqCst) {
        let mut view = state.write().await;
        for (name, update) in updates {
            update.apply(&mut view);
            debug!(operation = name, "slice applied");
        }
    } else {
        debug!("controller stopped; discarding settled results");
    }

    shared.loading.store(false, Ordering::SeqCst);
    failed == 0
}

fn lock_timer(
    timer: &Mutex<Option<JoinHandle<()>>>,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
