//! Search coordination.
//!
//! The coordinator owns the worker pool and is the only writer of the
//! aggregate attempt counters. Workers report over a bounded channel; the
//! coordinator folds each event into [`AggregateState`], derives statistics,
//! and forwards a snapshot to the presentation sink. The first match it
//! receives ends the run.
//!
//! ```text
//! Initializing -> Running -> Terminating -> Done
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, SearchConfig};
use crate::crypto::KeyGenerator;
use crate::matcher::Pattern;
use crate::sink::{PresentationSink, ProgressSnapshot, SearchResult};
use crate::stats::estimate;
use crate::worker::{FailureEvent, MatchEvent, ProgressEvent, WorkerEvent, WorkerId, WorkerPool};

/// How often the event loop wakes up to check for external cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Minimum depth of the worker event channel.
const MIN_EVENT_BUFFER: usize = 64;

/// Bounds for the backoff between attempts to deliver the final result.
const RESULT_RETRY_INITIAL: Duration = Duration::from_millis(10);
const RESULT_RETRY_MAX: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Initializing,
    Running,
    Terminating,
    Done,
}

/// How a search run ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A worker found a matching keypair
    Found(SearchResult),
    /// The run was stopped from outside before any match
    Cancelled { total_attempts: u64, elapsed: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("all {workers} workers failed before a match was found")]
    Exhausted { workers: usize },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Per-worker attempt counters, written only by the coordinator.
#[derive(Debug, Clone)]
pub struct AggregateState {
    per_worker_attempts: Vec<u64>,
    start_time: Instant,
}

impl AggregateState {
    fn new(workers: usize) -> Self {
        Self {
            per_worker_attempts: vec![0; workers],
            start_time: Instant::now(),
        }
    }

    /// Records a worker's latest count. Counts never move backwards.
    fn record(&mut self, worker_id: WorkerId, attempts: u64) -> bool {
        match self.per_worker_attempts.get_mut(worker_id) {
            Some(slot) => {
                *slot = (*slot).max(attempts);
                true
            }
            None => false,
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.per_worker_attempts.iter().sum()
    }

    pub fn per_worker_attempts(&self) -> &[u64] {
        &self.per_worker_attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Attempts per second across all workers since the run started.
    pub fn aggregate_speed(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.total_attempts() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Why the coordinator left `Running`.
#[derive(Debug)]
enum Termination {
    Found(SearchResult),
    Cancelled,
    Exhausted,
}

/// Drives one search run from validation to a final result.
pub struct Coordinator {
    config: SearchConfig,
    pattern: Pattern,
    state: CoordinatorState,
    aggregate: AggregateState,
    failed: Vec<bool>,
    active_workers: usize,
    stop_flag: Arc<AtomicBool>,
    termination: Option<Termination>,
}

impl Coordinator {
    /// Validates `config` and prepares a run. No worker is started yet.
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let workers = config.worker_count;

        Ok(Self {
            pattern: Pattern::new(config.prefix.clone(), config.suffix.clone()),
            config,
            state: CoordinatorState::Initializing,
            aggregate: AggregateState::new(workers),
            failed: vec![false; workers],
            active_workers: workers,
            stop_flag: Arc::new(AtomicBool::new(false)),
            termination: None,
        })
    }

    /// Returns the flag that cancels the run when set (e.g., from a signal handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn aggregate(&self) -> &AggregateState {
        &self.aggregate
    }

    /// Runs the search to completion.
    ///
    /// `factory` builds one key generator per worker. Progress snapshots and
    /// the final result go to `sink`; the result is also returned.
    pub fn run<G, F, S>(mut self, factory: F, mut sink: S) -> Result<SearchOutcome, SearchError>
    where
        G: KeyGenerator + Send + 'static,
        F: FnMut(WorkerId) -> G,
        S: PresentationSink,
    {
        let workers = self.config.worker_count;
        let (event_tx, event_rx) = bounded(MIN_EVENT_BUFFER.max(workers * 8));

        info!(
            pattern = %self.pattern,
            workers,
            report_interval = self.config.report_interval,
            "starting search"
        );

        let mut pool = WorkerPool::spawn(
            workers,
            &self.pattern,
            self.config.report_interval,
            factory,
            event_tx,
            self.stop_flag.clone(),
        )?;
        self.begin();

        while self.state == CoordinatorState::Running {
            match event_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(event) => self.handle_event(event, &mut sink),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop_flag.load(Ordering::Relaxed) {
                        self.cancel();
                    }
                }
                // Every worker has exited.
                Err(RecvTimeoutError::Disconnected) => {
                    if self.stop_flag.load(Ordering::Relaxed) {
                        self.cancel();
                    } else {
                        warn!("all workers exited unexpectedly");
                        self.terminate(Termination::Exhausted);
                    }
                }
            }
        }

        let report = pool.shutdown(self.config.shutdown_grace);
        debug!(joined = report.joined, abandoned = report.abandoned.len(), "workers stopped");
        drop(event_rx);

        self.finish(&mut sink)
    }

    fn begin(&mut self) {
        self.aggregate = AggregateState::new(self.config.worker_count);
        self.state = CoordinatorState::Running;
    }

    /// Folds one worker event into the aggregate state.
    ///
    /// Events arriving after the run has left `Running` are ignored.
    pub(crate) fn handle_event<S: PresentationSink>(&mut self, event: WorkerEvent, sink: &mut S) {
        if self.state != CoordinatorState::Running {
            debug!(worker = event.worker_id(), "ignoring event after termination");
            return;
        }

        match event {
            WorkerEvent::Progress(progress) => self.on_progress(progress, sink),
            WorkerEvent::Match(found) => self.on_match(found),
            WorkerEvent::Failure(failure) => self.on_failure(failure),
        }
    }

    fn on_progress<S: PresentationSink>(&mut self, event: ProgressEvent, sink: &mut S) {
        if !self.aggregate.record(event.worker_id, event.attempts) {
            warn!(worker = event.worker_id, "progress from unknown worker");
            return;
        }
        debug!(
            worker = event.worker_id,
            attempts = event.attempts,
            speed = event.speed(),
            "worker progress"
        );

        let stats = estimate(
            &self.config,
            self.aggregate.total_attempts(),
            self.aggregate.aggregate_speed(),
        );
        let snapshot = ProgressSnapshot {
            stats,
            per_worker_attempts: self.aggregate.per_worker_attempts().to_vec(),
            active_workers: self.active_workers,
            elapsed: self.aggregate.elapsed(),
        };

        if let Err(e) = sink.snapshot(&snapshot) {
            warn!(error = %e, "progress snapshot dropped");
        }
    }

    fn on_match(&mut self, event: MatchEvent) {
        self.aggregate.record(event.worker_id, event.attempts);
        info!(worker = event.worker_id, address = %event.address, "match found");

        let result = SearchResult {
            address: event.address,
            secret: event.secret,
            worker_id: event.worker_id,
            total_attempts: self.aggregate.total_attempts(),
            elapsed: self.aggregate.elapsed(),
        };
        self.terminate(Termination::Found(result));
    }

    fn on_failure(&mut self, event: FailureEvent) {
        let Some(failed) = self.failed.get_mut(event.worker_id) else {
            warn!(worker = event.worker_id, "failure from unknown worker");
            return;
        };
        if *failed {
            return;
        }
        *failed = true;
        self.aggregate.record(event.worker_id, event.attempts);
        self.active_workers -= 1;

        warn!(
            worker = event.worker_id,
            error = %event.error,
            remaining = self.active_workers,
            "worker failed"
        );

        if self.active_workers == 0 {
            self.terminate(Termination::Exhausted);
        }
    }

    fn cancel(&mut self) {
        info!("search cancelled");
        self.terminate(Termination::Cancelled);
    }

    fn terminate(&mut self, termination: Termination) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.termination = Some(termination);
        self.state = CoordinatorState::Terminating;
    }

    fn finish<S: PresentationSink>(&mut self, sink: &mut S) -> Result<SearchOutcome, SearchError> {
        self.state = CoordinatorState::Done;
        let total_attempts = self.aggregate.total_attempts();
        let elapsed = self.aggregate.elapsed();

        match self.termination.take() {
            Some(Termination::Found(result)) => {
                deliver_result(sink, &result);
                info!(total_attempts, elapsed = ?result.elapsed, "search finished");
                Ok(SearchOutcome::Found(result))
            }
            Some(Termination::Exhausted) => Err(SearchError::Exhausted {
                workers: self.config.worker_count,
            }),
            Some(Termination::Cancelled) | None => Ok(SearchOutcome::Cancelled {
                total_attempts,
                elapsed,
            }),
        }
    }
}

/// Hands the final result to the sink, retrying until it is accepted.
///
/// Gives up only when the sink is closed for good; the result is still
/// returned to the caller of [`Coordinator::run`].
fn deliver_result<S: PresentationSink>(sink: &mut S, result: &SearchResult) {
    let mut backoff = RESULT_RETRY_INITIAL;
    loop {
        match sink.result(result) {
            Ok(()) => return,
            Err(e) if e.is_transient() => {
                warn!(error = %e, retry_in = ?backoff, "result delivery failed, retrying");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(RESULT_RETRY_MAX);
            }
            Err(e) => {
                error!(error = %e, address = %result.address, "result could not be delivered");
                return;
            }
        }
    }
}
