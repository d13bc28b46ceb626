//! Stellar Vanity Address Generator CLI
//!
//! Usage:
//!   stellar_vanity -p GCGZC            # Find address starting with "GCGZC"
//!   stellar_vanity -s XLM              # Find address ending with "XLM"
//!   stellar_vanity -p GCGZC -s GZC -w 10

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::Receiver;
use tracing_subscriber::EnvFilter;

use stellar_vanity::stats::{self, difficulty_description};
use stellar_vanity::{
    ChannelSink, Config, Coordinator, ProgressSnapshot, SearchOutcome, SearchResult,
    SinkMessage, StellarKeyGenerator,
};

/// Minimum time between two rendered progress reports.
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    }

    let search = config.search_config();
    let expected = stats::estimate(&search, 0, 0.0).expected_attempts;

    // Print startup info
    println!("Stellar Vanity Address Generator");
    println!("================================");
    println!("Prefix:     {}", display_or_dash(&search.prefix));
    println!("Suffix:     {}", display_or_dash(&search.suffix));
    println!(
        "Difficulty: {} addresses, {}",
        format_number(expected as u64),
        difficulty_description(expected)
    );
    println!("Workers:    {}", search.worker_count);
    println!();

    let coordinator = match Coordinator::new(search) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    // Set up ctrl-c handler
    ctrlc_handler(coordinator.stop_handle());

    println!("Searching... (Press Ctrl+C to stop)\n");

    let (sink, messages) = ChannelSink::bounded(config.snapshot_buffer);
    let renderer = thread::Builder::new()
        .name("vanity-render".into())
        .spawn(move || render(messages))
        .unwrap_or_else(|e| {
            eprintln!("Failed to start renderer: {}", e);
            process::exit(1);
        });

    let outcome = coordinator.run(|_| StellarKeyGenerator::new(), sink);
    let _ = renderer.join();

    match outcome {
        Ok(SearchOutcome::Found(result)) => print_summary(result.total_attempts, result.elapsed),
        Ok(SearchOutcome::Cancelled {
            total_attempts,
            elapsed,
        }) => {
            println!("\nStopped by user.");
            print_summary(total_attempts, elapsed);
        }
        Err(e) => {
            eprintln!("Search failed: {}", e);
            process::exit(1);
        }
    }
}

/// Draws progress and the result until the sink is dropped.
fn render(messages: Receiver<SinkMessage>) {
    let mut last_render: Option<Instant> = None;

    for message in messages {
        match message {
            SinkMessage::Progress(snapshot) => {
                if last_render.map_or(true, |t| t.elapsed() >= RENDER_INTERVAL) {
                    print_progress(&snapshot);
                    last_render = Some(Instant::now());
                }
            }
            SinkMessage::Found(result) => print_result(&result),
        }
    }
}

fn print_progress(snapshot: &ProgressSnapshot) {
    let stats = &snapshot.stats;
    let eta = match stats.eta_hours {
        Some(hours) => format!("{:.1}h", hours),
        None => "N/A".into(),
    };

    println!(
        "[{:>5}s] {} attempts ({}/s) | p={:.15}% | ETA {} | progress {:.5}% | workers {}",
        snapshot.elapsed.as_secs(),
        format_number(stats.total_attempts),
        format_number(stats.aggregate_speed as u64),
        stats.probability_percent,
        eta,
        stats.progress_percent,
        snapshot.active_workers,
    );
    let per_worker: Vec<String> = snapshot
        .per_worker_attempts
        .iter()
        .enumerate()
        .map(|(id, attempts)| format!("#{}: {}", id + 1, format_number(*attempts)))
        .collect();
    println!("         {}", per_worker.join("  "));
}

fn print_result(result: &SearchResult) {
    println!("\n=== Match found ===");
    println!("Public Key:  {}", result.address);
    println!("Secret Key:  {}", result.secret);
    println!("Worker:      {}", result.worker_id + 1);
    println!("Elapsed:     {:.2}s", result.elapsed.as_secs_f64());
}

fn print_summary(total_attempts: u64, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let speed = if secs > 0.0 {
        total_attempts as f64 / secs
    } else {
        0.0
    };

    println!("\n--- Final Statistics ---");
    println!("Total keys generated: {}", format_number(total_attempts));
    println!("Time elapsed:         {:.2}s", secs);
    println!("Average speed:        {}/s", format_number(speed as u64));
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
}
