//! Search workers and worker pool management.
//!
//! This module provides:
//! - The events a worker emits to the coordinator
//! - The CPU search loop (`SearchWorker`)
//! - Spawning, cancelling and reclaiming worker threads (`WorkerPool`)
//!
//! Workers never share mutable state: everything they report travels over
//! a one-way channel to the coordinator.

mod cpu;
mod pool;

use std::time::Duration;

use crate::crypto::GeneratorError;

pub use cpu::{SearchWorker, WorkerExit};
pub use pool::{ShutdownReport, WorkerPool};

/// Index of a worker in `[0, worker_count)`, fixed at spawn time.
pub type WorkerId = usize;

/// Periodic progress report from one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub worker_id: WorkerId,
    /// Candidates tested by this worker so far
    pub attempts: u64,
    /// Time since this worker started
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Attempts per second for this worker alone.
    pub fn speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

/// A candidate that satisfied the pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub worker_id: WorkerId,
    pub attempts: u64,
    pub address: String,
    pub secret: String,
}

impl std::fmt::Debug for MatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEvent")
            .field("worker_id", &self.worker_id)
            .field("attempts", &self.attempts)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// A worker whose key generator failed; the worker has stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEvent {
    pub worker_id: WorkerId,
    pub attempts: u64,
    pub error: GeneratorError,
}

/// Everything a worker can tell the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Progress(ProgressEvent),
    Match(MatchEvent),
    Failure(FailureEvent),
}

impl WorkerEvent {
    pub fn worker_id(&self) -> WorkerId {
        match self {
            WorkerEvent::Progress(e) => e.worker_id,
            WorkerEvent::Match(e) => e.worker_id,
            WorkerEvent::Failure(e) => e.worker_id,
        }
    }
}
