//! Worker pool management.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::crypto::KeyGenerator;
use crate::matcher::Pattern;

use super::cpu::{SearchWorker, WorkerExit};
use super::{WorkerEvent, WorkerId};

/// Outcome of a bounded shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that stopped and were joined
    pub joined: usize,
    /// Workers still running when the grace period ran out
    pub abandoned: Vec<WorkerId>,
}

/// Announces a worker's exit on drop, so unwinding threads are reported too.
struct ExitGuard {
    id: WorkerId,
    exit_tx: Sender<WorkerId>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.exit_tx.send(self.id);
    }
}

/// Manages a pool of search worker threads.
pub struct WorkerPool {
    /// Worker thread handles, indexed by worker ID (taken once joined)
    handles: Vec<Option<JoinHandle<WorkerExit>>>,
    /// Worker IDs, sent as each thread finishes
    exit_rx: Receiver<WorkerId>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `num_workers` search threads.
    ///
    /// `factory` builds each worker's key generator on the calling thread.
    /// If a spawn fails, the workers already started are told to stop.
    pub fn spawn<G, F>(
        num_workers: usize,
        pattern: &Pattern,
        report_interval: u64,
        mut factory: F,
        event_tx: Sender<WorkerEvent>,
        stop_flag: Arc<AtomicBool>,
    ) -> io::Result<Self>
    where
        G: KeyGenerator + Send + 'static,
        F: FnMut(WorkerId) -> G,
    {
        let (exit_tx, exit_rx) = unbounded();
        let mut handles = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let worker = SearchWorker::new(
                id,
                pattern.clone(),
                report_interval,
                factory(id),
                event_tx.clone(),
                stop_flag.clone(),
            );
            let guard = ExitGuard {
                id,
                exit_tx: exit_tx.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || {
                    let _guard = guard;
                    worker.run()
                });

            match spawned {
                Ok(handle) => handles.push(Some(handle)),
                Err(e) => {
                    stop_flag.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }

        debug!(workers = num_workers, "worker pool started");

        Ok(Self {
            handles,
            exit_rx,
            stop_flag,
        })
    }

    /// Signals all workers to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Stops all workers and joins them, waiting at most `grace` overall.
    ///
    /// Workers that do not stop in time are detached; they hold nothing
    /// shared beyond their channel ends.
    pub fn shutdown(&mut self, grace: Duration) -> ShutdownReport {
        self.stop();

        let deadline = Instant::now() + grace;
        let mut report = ShutdownReport::default();
        let mut remaining = self.handles.iter().filter(|h| h.is_some()).count();

        while remaining > 0 {
            let Ok(id) = self.exit_rx.recv_deadline(deadline) else {
                break;
            };
            if let Some(handle) = self.handles.get_mut(id).and_then(Option::take) {
                match handle.join() {
                    Ok(exit) => debug!(worker = id, ?exit, "worker joined"),
                    Err(_) => warn!(worker = id, "worker panicked"),
                }
                report.joined += 1;
                remaining -= 1;
            }
        }

        for (id, slot) in self.handles.iter_mut().enumerate() {
            if slot.take().is_some() {
                warn!(worker = id, "worker did not stop within grace period, abandoning");
                report.abandoned.push(id);
            }
        }

        report
    }

    /// Returns the number of workers not yet joined or abandoned.
    pub fn num_workers(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    /// Returns true if the pool has been signaled to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
        // Join whatever has already finished; anything else is detached.
        for handle in self.handles.iter_mut().filter_map(Option::take) {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}
