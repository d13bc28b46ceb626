//! Pattern matching for Stellar addresses.
//!
//! An address matches when it starts with the configured prefix and ends
//! with the configured suffix. Matching is exact and case-sensitive.

mod pattern;

pub use pattern::{matches, Pattern};
