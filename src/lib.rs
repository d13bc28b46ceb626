//! # stellar_vanity
//!
//! Parallel Stellar vanity address generator.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation behind the `KeyGenerator` trait
//! - `matcher`: Prefix/suffix address matching
//! - `stats`: Difficulty, probability and ETA estimates
//! - `worker`: Search workers and worker pool management
//! - `coordinator`: Event aggregation and the search state machine
//! - `sink`: Structured progress/result delivery to a presentation layer
//! - `config`: Runtime configuration

pub mod config;
pub mod coordinator;
pub mod crypto;
pub mod matcher;
pub mod sink;
pub mod stats;
pub mod worker;

pub use config::{Config, ConfigError, SearchConfig};
pub use coordinator::{Coordinator, CoordinatorState, SearchError, SearchOutcome};
pub use crypto::{GeneratorError, KeyGenerator, Keypair, StellarKeyGenerator};
pub use matcher::{matches, Pattern};
pub use sink::{ChannelSink, PresentationSink, ProgressSnapshot, SearchResult, SinkError, SinkMessage};
pub use stats::{estimate, StatsSnapshot};
pub use worker::{MatchEvent, ProgressEvent, WorkerEvent, WorkerId, WorkerPool};
