//! Proof-of-work challenge and hashing primitives

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters in a SHA-256 digest; also the highest meaningful difficulty
pub const MAX_DIFFICULTY: u32 = 64;

/// Puzzle input: a public id bound to the moment the attempt started.
///
/// Each restart gets a new timestamp, so solutions never carry over between
/// attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Public identifier of the account being provisioned
    pub public_id: String,
    /// Unix time in milliseconds when the attempt started
    pub created_at_ms: i64,
}

impl Challenge {
    /// Challenge for `public_id` stamped with the current time
    pub fn new(public_id: impl Into<String>) -> Self {
        Self::at(public_id, chrono::Utc::now().timestamp_millis())
    }

    /// Challenge with an explicit timestamp
    pub fn at(public_id: impl Into<String>, created_at_ms: i64) -> Self {
        Self {
            public_id: public_id.into(),
            created_at_ms,
        }
    }

    /// `public_id || created_at_ms` as hashed by the solver
    pub fn seed(&self) -> String {
        format!("{}{}", self.public_id, self.created_at_ms)
    }
}

/// `hex(sha256(seed || decimal(nonce)))`
pub fn hash_attempt(seed: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Count of leading `'0'` characters in a hex string
pub fn leading_zeros(hash_hex: &str) -> usize {
    hash_hex.bytes().take_while(|&b| b == b'0').count()
}

/// Whether a hex digest has at least `difficulty` leading zeros
pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    leading_zeros(hash_hex) >= difficulty as usize
}

/// Hasher primed with the challenge seed, cloned once per nonce.
#[derive(Clone)]
pub(crate) struct PrimedHasher {
    prefix: Sha256,
}

impl PrimedHasher {
    pub(crate) fn new(seed: &str) -> Self {
        Self {
            prefix: Sha256::new_with_prefix(seed.as_bytes()),
        }
    }

    pub(crate) fn hash(&self, nonce: u64) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}
