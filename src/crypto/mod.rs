//! Key generation and address derivation.
//!
//! This module provides:
//! - The `KeyGenerator` seam the search workers draw candidates from
//! - A Stellar account generator (ed25519 keys, StrKey encoding)
//! - Keypair management

mod keypair;
mod stellar;

pub use keypair::{GeneratorError, KeyGenerator, Keypair};
pub use stellar::{StellarKeyGenerator, STRKEY_ADDRESS_LEN, STRKEY_ALPHABET};
