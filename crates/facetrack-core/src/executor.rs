//! Executors that run lane jobs off the ingestion thread.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::runtime::Handle;

use crate::error::{TrackResult, TrackerError};

/// A detection job dispatched onto a lane.
pub type LaneJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs lane jobs.
///
/// Implementations must not run the job on the calling thread: `spawn` is
/// called while the dispatching lane is locked.
pub trait LaneExecutor: Send + Sync {
    /// Schedule `job` for `lane`.
    fn spawn(&self, lane: &'static str, job: LaneJob);
}

/// Runs jobs on tokio's blocking thread pool.
///
/// Detection is CPU-bound and synchronous, so it never runs on the async
/// worker threads.
#[derive(Clone)]
pub struct BlockingExecutor {
    handle: Handle,
}

impl BlockingExecutor {
    /// Create an executor on an explicit runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create an executor on the runtime of the calling context.
    pub fn current() -> TrackResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| TrackerError::internal(format!("no tokio runtime: {e}")))
    }
}

impl LaneExecutor for BlockingExecutor {
    fn spawn(&self, _lane: &'static str, job: LaneJob) {
        // completion is observed through lane state, not the join handle
        drop(self.handle.spawn_blocking(job));
    }
}

/// Queues jobs until they are run explicitly.
///
/// Lets callers decide exactly when each detection completes relative to
/// incoming frames.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<(&'static str, LaneJob)>>,
}

impl ManualExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Number of queued jobs for one lane.
    pub fn pending_for(&self, lane: &str) -> usize {
        self.lock().iter().filter(|(name, _)| *name == lane).count()
    }

    /// Run the oldest queued job. Returns its lane, or `None` if idle.
    pub fn run_next(&self) -> Option<&'static str> {
        let (lane, job) = self.lock().pop_front()?;
        job();
        Some(lane)
    }

    /// Run the oldest queued job for one lane.
    pub fn run_next_for(&self, lane: &str) -> bool {
        let job = {
            let mut queue = self.lock();
            let position = queue.iter().position(|(name, _)| *name == lane);
            position.and_then(|i| queue.remove(i))
        };
        match job {
            Some((_, job)) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run queued jobs, including any they enqueue, until none are left.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next().is_some() {
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(&'static str, LaneJob)>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LaneExecutor for ManualExecutor {
    fn spawn(&self, lane: &'static str, job: LaneJob) {
        self.lock().push_back((lane, job));
    }
}
