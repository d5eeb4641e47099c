//! Single-slot scheduling lanes.
//!
//! A lane admits at most one job at a time and rate-limits new jobs by the
//! time since the previous one completed. Its status, completion stamp and
//! any state the lane owns sit behind one mutex, so every transition is
//! made through a [`LaneGuard`].

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// Scheduling status of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneStatus {
    /// No job running; a new one may start once the interval has passed
    Idle,
    /// A job has been dispatched and has not completed yet
    InFlight,
}

struct LaneInner<T> {
    status: LaneStatus,
    last_completion: Option<Instant>,
    state: T,
}

/// A lane guarding its status together with lane-owned state `T`.
pub struct Lane<T> {
    name: &'static str,
    inner: Mutex<LaneInner<T>>,
}

impl<T> Lane<T> {
    /// Create an idle lane that has never completed a job.
    pub fn new(name: &'static str, state: T) -> Self {
        Self {
            name,
            inner: Mutex::new(LaneInner {
                status: LaneStatus::Idle,
                last_completion: None,
                state,
            }),
        }
    }

    /// Lane name for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lock the lane.
    ///
    /// A poisoned lock is recovered: lane state is only ever replaced
    /// wholesale, so a panicking holder cannot leave it half-written.
    pub fn lock(&self) -> LaneGuard<'_, T> {
        LaneGuard {
            name: self.name,
            inner: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Exclusive access to a lane.
pub struct LaneGuard<'a, T> {
    name: &'static str,
    inner: MutexGuard<'a, LaneInner<T>>,
}

impl<T> LaneGuard<'_, T> {
    /// Current status.
    pub fn status(&self) -> LaneStatus {
        self.inner.status
    }

    /// Whether a job is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.inner.status == LaneStatus::InFlight
    }

    /// When the previous job completed, if any has.
    pub fn last_completion(&self) -> Option<Instant> {
        self.inner.last_completion
    }

    /// Claim the lane for a new job.
    ///
    /// Succeeds only when the lane is idle and either `bypass_interval` is
    /// set or more than `interval` has passed since the last completion.
    /// A zero interval admits a job whenever the lane is idle.
    pub fn try_begin_job(&mut self, now: Instant, interval: Duration, bypass_interval: bool) -> bool {
        if self.inner.status == LaneStatus::InFlight {
            return false;
        }

        let due = bypass_interval
            || interval.is_zero()
            || match self.inner.last_completion {
                Some(completed) => now.saturating_duration_since(completed) > interval,
                None => true,
            };
        if !due {
            return false;
        }

        self.inner.status = LaneStatus::InFlight;
        trace!(lane = self.name, "Lane job started");
        true
    }

    /// Release the lane and stamp the completion time.
    pub fn end_job(&mut self, now: Instant) {
        self.inner.status = LaneStatus::Idle;
        self.inner.last_completion = Some(now);
        trace!(lane = self.name, "Lane job finished");
    }
}

impl<T> Deref for LaneGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.state
    }
}

impl<T> DerefMut for LaneGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner.state
    }
}
