//! CPU-based search worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{SendTimeoutError, Sender, TrySendError};
use tracing::{debug, trace, warn};

use crate::crypto::KeyGenerator;
use crate::matcher::Pattern;

use super::{FailureEvent, MatchEvent, ProgressEvent, WorkerEvent, WorkerId};

/// How long a terminal event send blocks before the stop flag is rechecked.
const TERMINAL_SEND_POLL: Duration = Duration::from_millis(50);

/// Why a worker loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// This worker found a match and reported it
    Matched,
    /// The stop flag was raised
    Cancelled,
    /// The key generator failed
    Failed,
    /// The coordinator is gone
    Disconnected,
}

/// A worker that generates and tests keypairs until told to stop.
pub struct SearchWorker<G> {
    id: WorkerId,
    pattern: Pattern,
    report_interval: u64,
    generator: G,
    event_tx: Sender<WorkerEvent>,
    stop_flag: Arc<AtomicBool>,
}

impl<G: KeyGenerator> SearchWorker<G> {
    pub fn new(
        id: WorkerId,
        pattern: Pattern,
        report_interval: u64,
        generator: G,
        event_tx: Sender<WorkerEvent>,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            pattern,
            report_interval: report_interval.max(1),
            generator,
            event_tx,
            stop_flag,
        }
    }

    /// Runs the worker loop.
    ///
    /// Generates keypairs and tests them against the pattern until:
    /// - A match is found (sends the match and stops)
    /// - The stop flag is set
    /// - The key generator fails (sends a failure and stops)
    /// - The channel is closed
    pub fn run(mut self) -> WorkerExit {
        let start = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                debug!(worker = self.id, attempts, "worker cancelled");
                return WorkerExit::Cancelled;
            }

            let keypair = match self.generator.generate() {
                Ok(keypair) => keypair,
                Err(error) => {
                    warn!(worker = self.id, attempts, %error, "key generator failed");
                    let event = WorkerEvent::Failure(FailureEvent {
                        worker_id: self.id,
                        attempts,
                        error,
                    });
                    self.send_terminal(event);
                    return WorkerExit::Failed;
                }
            };
            attempts += 1;

            if self.pattern.matches(keypair.address()) {
                debug!(worker = self.id, attempts, address = keypair.address(), "match found");
                let (address, secret) = keypair.into_parts();
                let event = WorkerEvent::Match(MatchEvent {
                    worker_id: self.id,
                    attempts,
                    address,
                    secret,
                });
                return if self.send_terminal(event) {
                    WorkerExit::Matched
                } else {
                    WorkerExit::Disconnected
                };
            }

            if attempts % self.report_interval == 0 {
                let event = WorkerEvent::Progress(ProgressEvent {
                    worker_id: self.id,
                    attempts,
                    elapsed: start.elapsed(),
                });
                match self.event_tx.try_send(event) {
                    Ok(()) => {}
                    // Progress is best-effort; the next report supersedes this one.
                    Err(TrySendError::Full(_)) => {
                        trace!(worker = self.id, attempts, "progress dropped, channel full");
                    }
                    Err(TrySendError::Disconnected(_)) => return WorkerExit::Disconnected,
                }
            }
        }
    }

    /// Delivers an event that must not be dropped.
    ///
    /// Blocks while the channel is full, giving up only if the coordinator
    /// has gone away or the search was already stopped by someone else.
    fn send_terminal(&self, mut event: WorkerEvent) -> bool {
        loop {
            match self.event_tx.send_timeout(event, TERMINAL_SEND_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Disconnected(_)) => return false,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.stop_flag.load(Ordering::Relaxed) {
                        return false;
                    }
                    event = returned;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crossbeam_channel::{bounded, unbounded};

    use super::*;
    use crate::crypto::{GeneratorError, Keypair};

    /// Yields the scripted addresses in order, then reports exhaustion.
    struct Scripted(VecDeque<&'static str>);

    impl Scripted {
        fn new(addresses: &[&'static str]) -> Self {
            Self(addresses.iter().copied().collect())
        }
    }

    impl KeyGenerator for Scripted {
        fn generate(&mut self) -> Result<Keypair, GeneratorError> {
            self.0
                .pop_front()
                .map(|a| Keypair::new(a, format!("S-{}", a)))
                .ok_or(GeneratorError::Exhausted)
        }
    }

    fn worker(
        addresses: &[&'static str],
        prefix: &str,
        report_interval: u64,
    ) -> (SearchWorker<Scripted>, crossbeam_channel::Receiver<WorkerEvent>, Arc<AtomicBool>) {
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let w = SearchWorker::new(
            0,
            Pattern::new(prefix, ""),
            report_interval,
            Scripted::new(addresses),
            tx,
            stop.clone(),
        );
        (w, rx, stop)
    }

    #[test]
    fn test_stops_on_match() {
        let (w, rx, _stop) = worker(&["XA", "XB", "MATCH1", "XC"], "MATCH", 10);
        assert_eq!(w.run(), WorkerExit::Matched);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            WorkerEvent::Match(m) => {
                assert_eq!(m.address, "MATCH1");
                assert_eq!(m.secret, "S-MATCH1");
                assert_eq!(m.attempts, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_progress_then_failure() {
        let (w, rx, _stop) = worker(&["A1", "A2", "A3", "A4", "A5"], "MATCH", 2);
        assert_eq!(w.run(), WorkerExit::Failed);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Progress(p) => Some(p.attempts),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![2, 4]);
        assert!(matches!(
            &events[2],
            WorkerEvent::Failure(FailureEvent { attempts: 5, error: GeneratorError::Exhausted, .. })
        ));
    }

    #[test]
    fn test_cancelled_before_first_attempt() {
        let (w, rx, stop) = worker(&["MATCH1"], "MATCH", 1);
        stop.store(true, Ordering::Relaxed);
        assert_eq!(w.run(), WorkerExit::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failure_delivered_through_full_channel() {
        let (tx, rx) = bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let w = SearchWorker::new(
            3,
            Pattern::new("MATCH", ""),
            1,
            Scripted::new(&["A", "B", "C"]),
            tx,
            stop,
        );
        // Failure needs the slot the first progress event occupies; drain in the background.
        let handle = std::thread::spawn(move || w.run());
        let mut received = Vec::new();
        while let Ok(event) = rx.recv() {
            received.push(event);
        }
        assert_eq!(handle.join().unwrap(), WorkerExit::Failed);
        assert!(matches!(received.last(), Some(WorkerEvent::Failure(_))));
        assert!(received.iter().all(|e| e.worker_id() == 3));
    }

    #[test]
    fn test_progress_monotonic() {
        let addresses: Vec<&'static str> = vec!["A"; 20];
        let (w, rx, _stop) = worker(&addresses, "MATCH", 3);
        w.run();
        let attempts: Vec<u64> = rx
            .try_iter()
            .filter_map(|e| match e {
                WorkerEvent::Progress(p) => Some(p.attempts),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![3, 6, 9, 12, 15, 18]);
        assert!(attempts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_disconnected_channel() {
        let (w, rx, _stop) = worker(&["A", "B"], "MATCH", 1);
        drop(rx);
        assert_eq!(w.run(), WorkerExit::Disconnected);
    }
}
