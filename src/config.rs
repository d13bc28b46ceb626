//! Runtime configuration for the vanity address generator.

use std::time::Duration;

use clap::Parser;

use crate::crypto::{STRKEY_ADDRESS_LEN, STRKEY_ALPHABET};

/// Default number of attempts between worker progress reports.
pub const DEFAULT_REPORT_INTERVAL: u64 = 5000;

/// Number of distinct symbols in a StrKey (base32) address.
pub const DEFAULT_ALPHABET_SIZE: u32 = 32;

/// Stellar Vanity Address Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Prefix the address must start with (StrKey characters: A-Z, 2-7)
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Suffix the address must end with (StrKey characters: A-Z, 2-7)
    #[arg(short, long, default_value = "")]
    pub suffix: String,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Attempts between progress reports from each worker
    #[arg(short, long, default_value_t = DEFAULT_REPORT_INTERVAL)]
    pub report_interval: u64,

    /// Number of symbols in the address encoding, used for difficulty estimates
    #[arg(long, default_value_t = DEFAULT_ALPHABET_SIZE)]
    pub alphabet_size: u32,

    /// How long to wait for workers to stop after a match, in milliseconds
    #[arg(long, default_value = "2000")]
    pub grace_ms: u64,

    /// Number of progress snapshots buffered for the console before dropping
    #[arg(long, default_value = "64")]
    pub snapshot_buffer: usize,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Validates the configuration.
    ///
    /// On top of the generic checks in [`SearchConfig::validate`], rejects
    /// patterns that no Stellar account address can ever satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search_config().validate()?;

        for (name, part) in [("Prefix", &self.prefix), ("Suffix", &self.suffix)] {
            if let Some(c) = part.chars().find(|c| !STRKEY_ALPHABET.contains(*c)) {
                return Err(ConfigError::InvalidPattern(format!(
                    "{} contains '{}'; only uppercase A-Z and digits 2-7 occur in addresses",
                    name, c
                )));
            }
        }

        if !self.prefix.is_empty() && !self.prefix.starts_with('G') {
            return Err(ConfigError::InvalidPattern(
                "Account addresses always start with 'G'".into(),
            ));
        }

        // The version byte leaves only two free bits for the second character.
        if let Some(c) = self.prefix.chars().nth(1).filter(|c| !"ABCD".contains(*c)) {
            return Err(ConfigError::InvalidPattern(format!(
                "Second character must be A, B, C or D, got '{}'",
                c
            )));
        }

        if self.prefix.len() + self.suffix.len() > STRKEY_ADDRESS_LEN {
            return Err(ConfigError::InvalidPattern(format!(
                "Combined prefix + suffix cannot be longer than {} characters",
                STRKEY_ADDRESS_LEN
            )));
        }

        Ok(())
    }

    /// Builds the immutable search configuration handed to the coordinator.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            worker_count: self.worker_count(),
            report_interval: self.report_interval,
            alphabet_size: self.alphabet_size,
            shutdown_grace: Duration::from_millis(self.grace_ms),
        }
    }
}

/// Immutable parameters of a single search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub prefix: String,
    pub suffix: String,
    pub worker_count: usize,
    /// Attempts between progress events, per worker
    pub report_interval: u64,
    pub alphabet_size: u32,
    /// Bounded wait for workers to acknowledge cancellation
    pub shutdown_grace: Duration,
}

impl SearchConfig {
    /// Creates a configuration with the default report interval, alphabet and grace period.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>, worker_count: usize) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            worker_count,
            report_interval: DEFAULT_REPORT_INTERVAL,
            alphabet_size: DEFAULT_ALPHABET_SIZE,
            shutdown_grace: Duration::from_secs(2),
        }
    }

    pub fn with_report_interval(mut self, report_interval: u64) -> Self {
        self.report_interval = report_interval;
        self
    }

    pub fn with_alphabet_size(mut self, alphabet_size: u32) -> Self {
        self.alphabet_size = alphabet_size;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Total number of fixed characters in the pattern.
    pub fn pattern_len(&self) -> usize {
        self.prefix.chars().count() + self.suffix.chars().count()
    }

    /// Validates the configuration before any worker is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() && self.suffix.is_empty() {
            return Err(ConfigError::TrivialPattern);
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        if self.report_interval == 0 {
            return Err(ConfigError::InvalidReportInterval);
        }
        if self.alphabet_size == 0 {
            return Err(ConfigError::InvalidAlphabetSize);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid pattern: prefix and suffix are both empty, every address would match")]
    TrivialPattern,

    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("Report interval must be at least 1 attempt")]
    InvalidReportInterval,

    #[error("Alphabet size must be at least 1")]
    InvalidAlphabetSize,
}
