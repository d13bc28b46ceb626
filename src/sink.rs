//! Structured delivery of progress snapshots and the final result.
//!
//! The coordinator never renders anything itself. It hands a
//! [`ProgressSnapshot`] or a [`SearchResult`] to a [`PresentationSink`],
//! which may draw a console UI, write logs, or forward them elsewhere.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};

use crate::stats::StatsSnapshot;
use crate::worker::WorkerId;

/// How long [`ChannelSink`] waits for room before reporting a result send as timed out.
const RESULT_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Aggregate view of the search after a progress event.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub stats: StatsSnapshot,
    /// Latest attempt count reported by each worker, indexed by worker ID
    pub per_worker_attempts: Vec<u64>,
    /// Workers still searching
    pub active_workers: usize,
    /// Time since the search started
    pub elapsed: Duration,
}

/// The keypair that ended the search.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub address: String,
    pub secret: String,
    pub worker_id: WorkerId,
    /// Attempts across all workers known when the match arrived
    pub total_attempts: u64,
    pub elapsed: Duration,
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .field("worker_id", &self.worker_id)
            .field("total_attempts", &self.total_attempts)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("sink is full")]
    Full,

    #[error("sink did not accept the message in time")]
    Timeout,

    #[error("sink is closed")]
    Closed,
}

impl SinkError {
    /// Whether retrying the same delivery can succeed.
    pub fn is_transient(self) -> bool {
        !matches!(self, SinkError::Closed)
    }
}

/// Receiver of structured search updates.
///
/// Implementations must not block for long: the coordinator calls them
/// from its event loop.
pub trait PresentationSink {
    /// Delivers a progress snapshot. Failures are logged and the snapshot dropped.
    fn snapshot(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SinkError>;

    /// Delivers the final result. Transient failures are retried by the caller.
    fn result(&mut self, result: &SearchResult) -> Result<(), SinkError>;
}

impl<S: PresentationSink + ?Sized> PresentationSink for &mut S {
    fn snapshot(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SinkError> {
        (**self).snapshot(snapshot)
    }

    fn result(&mut self, result: &SearchResult) -> Result<(), SinkError> {
        (**self).result(result)
    }
}

/// Messages produced by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    Progress(ProgressSnapshot),
    Found(SearchResult),
}

/// Forwards updates over a bounded channel to a rendering thread.
///
/// Snapshots are offered without blocking and dropped when the channel is
/// full; results wait briefly for room.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<SinkMessage>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its messages arrive on.
    pub fn bounded(capacity: usize) -> (Self, Receiver<SinkMessage>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl PresentationSink for ChannelSink {
    fn snapshot(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SinkError> {
        self.tx
            .try_send(SinkMessage::Progress(snapshot.clone()))
            .map_err(|e| match e {
                TrySendError::Full(_) => SinkError::Full,
                TrySendError::Disconnected(_) => SinkError::Closed,
            })
    }

    fn result(&mut self, result: &SearchResult) -> Result<(), SinkError> {
        self.tx
            .send_timeout(SinkMessage::Found(result.clone()), RESULT_SEND_TIMEOUT)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SinkError::Timeout,
                SendTimeoutError::Disconnected(_) => SinkError::Closed,
            })
    }
}
