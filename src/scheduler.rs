//! One-shot timers used for Web Storage expiration.
//!
//! The stores never touch a clock or a timer directly; they receive an
//! `Arc<dyn Scheduler>` at construction. [`TokioScheduler`] is the runtime
//! implementation and [`ManualScheduler`] lets tests move time by hand.

use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};
use time::{Duration, OffsetDateTime};
use tokio::runtime::{Handle, Runtime};

/// Deferred work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// Clock plus one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> OffsetDateTime;

    /// Runs `task` once, at or after `at`. Timers cannot be cancelled.
    fn schedule_at(&self, at: OffsetDateTime, task: Task);
}

static TIMER_RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

/// Timers backed by tokio sleep tasks.
///
/// Uses the runtime the scheduler was created on, or a small background
/// runtime when created outside of one.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Option<Handle>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        let handle = Handle::try_current().ok().or_else(|| {
            TIMER_RUNTIME
                .get_or_init(|| {
                    tokio::runtime::Builder::new_multi_thread()
                        .worker_threads(1)
                        .thread_name("synced-storage-timer")
                        .enable_time()
                        .build()
                        .map_err(|e| log::error!("Cannot start timer runtime: {e}"))
                        .ok()
                })
                .as_ref()
                .map(|rt| rt.handle().clone())
        });

        Self { handle }
    }

    /// Scheduler bound to an explicit runtime handle.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("has_runtime", &self.handle.is_some())
            .finish()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn schedule_at(&self, at: OffsetDateTime, task: Task) {
        let Some(handle) = &self.handle else {
            log::error!("No timer runtime available; timer for {at} dropped");
            return;
        };

        let delay = std::time::Duration::try_from(at - self.now()).unwrap_or_default();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Deterministic scheduler whose clock only moves through [`advance`](Self::advance).
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

struct ManualState {
    now: OffsetDateTime,
    next_seq: u64,
    pending: Vec<(OffsetDateTime, u64, Task)>,
}

impl ManualScheduler {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                next_seq: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Moves the clock forward by `by` and runs every timer that became due,
    /// earliest first. Tasks run without the scheduler lock held.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;

        loop {
            let due = {
                let mut state = self.lock();
                let next = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _, _))| *at <= target)
                    .min_by_key(|(_, (at, seq, _))| (*at, *seq))
                    .map(|(i, _)| i);

                match next {
                    Some(i) => {
                        let (at, _, task) = state.pending.remove(i);
                        if at > state.now {
                            state.now = at;
                        }
                        Some(task)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match due {
                Some(task) => task(),
                None => break,
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> OffsetDateTime {
        self.lock().now
    }

    fn schedule_at(&self, at: OffsetDateTime, task: Task) {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push((at, seq, task));
    }
}
