//! Keypair representation and the generator contract.

use std::fmt;

/// A generated keypair: the public address and its secret, both as encoded strings.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    address: String,
    secret: String,
}

impl Keypair {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// Returns the public address.
    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the encoded secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Splits the keypair into `(address, secret)`.
    pub fn into_parts(self) -> (String, String) {
        (self.address, self.secret)
    }
}

// The secret must never end up in logs.
impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Errors a key generator can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("key generator has no more candidates")]
    Exhausted,

    #[error("key generation failed: {0}")]
    Backend(String),
}

/// Source of random candidate keypairs.
///
/// Each worker owns its own generator, so implementations need not be `Sync`.
pub trait KeyGenerator {
    /// Produces one uniformly random keypair and its address.
    fn generate(&mut self) -> Result<Keypair, GeneratorError>;
}

impl<G: KeyGenerator + ?Sized> KeyGenerator for Box<G> {
    fn generate(&mut self) -> Result<Keypair, GeneratorError> {
        (**self).generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let keypair = Keypair::new("GABC", "SXYZ");
        let debug = format!("{:?}", keypair);
        assert!(debug.contains("GABC"));
        assert!(!debug.contains("SXYZ"));
    }

    #[test]
    fn test_into_parts() {
        let (address, secret) = Keypair::new("GABC", "SXYZ").into_parts();
        assert_eq!(address, "GABC");
        assert_eq!(secret, "SXYZ");
    }
}
