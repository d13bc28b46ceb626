//! Stellar account keypair generation.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

use super::{GeneratorError, KeyGenerator, Keypair};

/// Characters that can appear in a StrKey encoded address (RFC 4648 base32).
pub const STRKEY_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of an encoded account address (`G...`).
pub const STRKEY_ADDRESS_LEN: usize = 56;

/// Generates Stellar account keypairs from OS randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct StellarKeyGenerator;

impl StellarKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Derives the keypair for a known 32-byte ed25519 seed.
    pub fn from_seed(seed: [u8; 32]) -> Keypair {
        Self::encode(&SigningKey::from_bytes(&seed))
    }

    #[inline]
    fn encode(signing_key: &SigningKey) -> Keypair {
        let address = PublicKey(signing_key.verifying_key().to_bytes()).to_string();
        let secret = PrivateKey(signing_key.to_bytes()).to_string();
        Keypair::new(address, secret)
    }
}

impl KeyGenerator for StellarKeyGenerator {
    #[inline]
    fn generate(&mut self) -> Result<Keypair, GeneratorError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(Self::encode(&signing_key))
    }
}
