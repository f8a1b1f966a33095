//! Randomness sources for key and seed phrase generation.

use std::sync::Arc;

/// Source of cryptographically secure random bytes.
///
/// Key generation and mnemonic derivation take one of these instead of
/// calling the OS directly, so an unavailable platform RNG can be simulated.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), getrandom::Error>;
}

/// The operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
        getrandom::getrandom(dest)
    }
}

/// Shared handle to the OS entropy source.
pub fn os_entropy() -> Arc<dyn EntropySource> {
    Arc::new(OsEntropy)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Entropy source that always fails, as on a host without an RNG.
    pub struct UnavailableEntropy;

    impl EntropySource for UnavailableEntropy {
        fn try_fill(&self, _dest: &mut [u8]) -> Result<(), getrandom::Error> {
            Err(getrandom::Error::UNSUPPORTED)
        }
    }

    /// Entropy source that repeats a fixed byte pattern.
    pub struct FixedEntropy(pub Vec<u8>);

    impl EntropySource for FixedEntropy {
        fn try_fill(&self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
            for (i, byte) in dest.iter_mut().enumerate() {
                *byte = self.0[i % self.0.len()];
            }
            Ok(())
        }
    }
}
