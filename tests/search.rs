//! End-to-end search runs against scripted key generators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use stellar_vanity::{
    ChannelSink, Coordinator, GeneratorError, KeyGenerator, Keypair, PresentationSink,
    ProgressSnapshot, SearchConfig, SearchError, SearchOutcome, SearchResult, SinkError,
    SinkMessage, StellarKeyGenerator,
};

/// Yields scripted addresses in order, counting calls, then reports exhaustion.
struct Scripted {
    addresses: VecDeque<String>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(addresses: &[&str], calls: Arc<AtomicUsize>) -> Self {
        Self {
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            calls,
        }
    }
}

impl KeyGenerator for Scripted {
    fn generate(&mut self) -> Result<Keypair, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let address = self.addresses.pop_front().ok_or(GeneratorError::Exhausted)?;
        let secret = format!("SECRET-{}", address);
        Ok(Keypair::new(address, secret))
    }
}

/// Never produces a match.
struct NeverMatches;

impl KeyGenerator for NeverMatches {
    fn generate(&mut self) -> Result<Keypair, GeneratorError> {
        thread::yield_now();
        Ok(Keypair::new("GAAAAAAAAA", "SAAAAAAAAA"))
    }
}

#[derive(Default)]
struct Recorder {
    snapshots: Vec<ProgressSnapshot>,
    results: Vec<SearchResult>,
}

impl PresentationSink for Recorder {
    fn snapshot(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SinkError> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn result(&mut self, result: &SearchResult) -> Result<(), SinkError> {
        self.results.push(result.clone());
        Ok(())
    }
}

#[test]
fn single_worker_finds_third_candidate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SearchConfig::new("MATCH", "", 1).with_report_interval(10);
    let mut sink = Recorder::default();

    let generator_calls = calls.clone();
    let outcome = Coordinator::new(config)
        .unwrap()
        .run(
            move |_| Scripted::new(&["XA", "XB", "MATCH1", "XC"], generator_calls.clone()),
            &mut sink,
        )
        .unwrap();

    match outcome {
        SearchOutcome::Found(result) => {
            assert_eq!(result.address, "MATCH1");
            assert_eq!(result.secret, "SECRET-MATCH1");
            assert_eq!(result.worker_id, 0);
            assert_eq!(result.total_attempts, 3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(sink.snapshots.is_empty());
    assert_eq!(sink.results.len(), 1);
    assert_eq!(sink.results[0].address, "MATCH1");
}

#[test]
fn exhausted_generator_reports_progress_then_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SearchConfig::new("MATCH", "", 1).with_report_interval(2);
    let mut sink = Recorder::default();

    let generator_calls = calls.clone();
    let err = Coordinator::new(config)
        .unwrap()
        .run(
            move |_| Scripted::new(&["A1", "A2", "A3", "A4", "A5"], generator_calls.clone()),
            &mut sink,
        )
        .unwrap_err();

    assert!(matches!(err, SearchError::Exhausted { workers: 1 }));
    let totals: Vec<u64> = sink.snapshots.iter().map(|s| s.stats.total_attempts).collect();
    assert_eq!(totals, vec![2, 4]);
    assert!(sink.results.is_empty());
    // Five candidates plus the failing call
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn failed_worker_does_not_stop_the_others() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SearchConfig::new("GOOD", "", 2).with_report_interval(1);
    let mut sink = Recorder::default();

    let generator_calls = calls.clone();
    let outcome = Coordinator::new(config)
        .unwrap()
        .run(
            move |id| {
                let script: &[&str] = if id == 0 {
                    &[]
                } else {
                    &["GA", "GB", "GC", "GOODONE"]
                };
                Scripted::new(script, generator_calls.clone())
            },
            &mut sink,
        )
        .unwrap();

    match outcome {
        SearchOutcome::Found(result) => {
            assert_eq!(result.address, "GOODONE");
            assert_eq!(result.worker_id, 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn external_cancellation_stops_all_workers() {
    let config = SearchConfig::new("GZZZ", "", 4)
        .with_report_interval(1000)
        .with_shutdown_grace(Duration::from_secs(5));
    let coordinator = Coordinator::new(config).unwrap();
    let stop = coordinator.stop_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::Relaxed);
    });

    let mut sink = Recorder::default();
    let outcome = coordinator.run(|_| NeverMatches, &mut sink).unwrap();
    canceller.join().unwrap();

    assert!(matches!(outcome, SearchOutcome::Cancelled { .. }));
    assert!(sink.results.is_empty());
    for snapshot in &sink.snapshots {
        assert_eq!(snapshot.per_worker_attempts.len(), 4);
        assert_eq!(
            snapshot.per_worker_attempts.iter().sum::<u64>(),
            snapshot.stats.total_attempts
        );
    }
}

#[test]
fn rejects_pattern_that_matches_everything() {
    assert!(Coordinator::new(SearchConfig::new("", "", 2)).is_err());
}

#[test]
fn finds_real_stellar_address_through_channel_sink() {
    // The second character of an account address is always one of A-D.
    let config = SearchConfig::new("GA", "", 2).with_report_interval(16);
    let (sink, rx) = ChannelSink::bounded(8);

    let renderer = thread::spawn(move || {
        rx.iter()
            .filter_map(|msg| match msg {
                SinkMessage::Found(result) => Some(result),
                SinkMessage::Progress(_) => None,
            })
            .collect::<Vec<_>>()
    });

    let outcome = Coordinator::new(config)
        .unwrap()
        .run(|_| StellarKeyGenerator::new(), sink)
        .unwrap();
    let delivered = renderer.join().unwrap();

    let SearchOutcome::Found(result) = outcome else {
        panic!("search did not find a match");
    };
    assert!(result.address.starts_with("GA"));
    assert_eq!(result.address.len(), 56);
    assert!(result.secret.starts_with('S'));
    assert_eq!(delivered, vec![result]);
}
