//! Difficulty and time-to-success estimates.
//!
//! Under uniform sampling every address position is an independent draw from
//! an alphabet of `alphabet_size` symbols, so a pattern with `n` fixed
//! characters is hit with probability `alphabet_size^-n` per attempt and
//! needs `alphabet_size^n` attempts on average.
//!
//! `expected_attempts` is carried as `f64`. It is exact while the value stays
//! below 2^53 (pattern length <= 10 for a 32 symbol alphabet); beyond that it
//! is the nearest representable float. Use [`expected_attempts_exact`] when
//! the integer value matters.

use crate::config::SearchConfig;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Derived statistics for one point in a search run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    /// Mean number of attempts to find one match
    pub expected_attempts: f64,
    /// Per-attempt success probability, as a percentage
    pub probability_percent: f64,
    /// Expected time to a match at the current speed; `None` while the speed is unknown
    pub eta_hours: Option<f64>,
    /// Attempts so far relative to the expected count; may exceed 100
    pub progress_percent: f64,
    pub total_attempts: u64,
    /// Attempts per second across all workers
    pub aggregate_speed: f64,
}

/// Computes the statistics for `total_attempts` made at `aggregate_speed` attempts/s.
pub fn estimate(config: &SearchConfig, total_attempts: u64, aggregate_speed: f64) -> StatsSnapshot {
    let base = config.alphabet_size as f64;
    let exponent = i32::try_from(config.pattern_len()).unwrap_or(i32::MAX);

    let expected_attempts = base.powi(exponent);
    let probability = base.powi(-exponent);

    let eta_hours = if aggregate_speed > 0.0 && aggregate_speed.is_finite() {
        Some(expected_attempts / aggregate_speed / SECONDS_PER_HOUR)
    } else {
        None
    };

    StatsSnapshot {
        expected_attempts,
        probability_percent: probability * 100.0,
        eta_hours,
        progress_percent: total_attempts as f64 / expected_attempts * 100.0,
        total_attempts,
        aggregate_speed,
    }
}

/// Exact `alphabet_size ^ pattern_len`, or `None` if it does not fit in a `u128`.
pub fn expected_attempts_exact(alphabet_size: u32, pattern_len: usize) -> Option<u128> {
    let exponent = u32::try_from(pattern_len).ok()?;
    u128::from(alphabet_size).checked_pow(exponent)
}

/// Returns a human-readable difficulty estimate.
pub fn difficulty_description(expected_attempts: f64) -> &'static str {
    match expected_attempts {
        d if d <= 1e3 => "Very Easy (< 1 second)",
        d if d <= 1e5 => "Easy (seconds)",
        d if d <= 1e7 => "Medium (minutes)",
        d if d <= 1e9 => "Hard (hours)",
        _ => "Very Hard (days or more)",
    }
}
