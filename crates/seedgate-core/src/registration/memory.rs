//! In-process registrar
//!
//! Applies the checks a real registration service owes the client: it
//! recomputes the proof-of-work hash, enforces a minimum difficulty, checks
//! the draft signature, refuses duplicate public ids, and keeps only a
//! SHA-256 digest of the seed phrase.

use std::collections::HashMap;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{RegisteredAccount, Registrar, RegistrationRequest};
use crate::error::{ProvisionError, ProvisionResult};
use crate::pow::ProofOfWorkResult;

struct StoredAccount {
    account: RegisteredAccount,
    seed_phrase_digest: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, StoredAccount>,
    /// Every proof received, accepted or not, in arrival order
    received: Vec<ProofOfWorkResult>,
    /// Remaining simulated outages
    outages: u32,
    ledger_height: u64,
}

/// Registrar that keeps accounts in memory.
pub struct MemoryRegistrar {
    min_difficulty: u32,
    inner: Mutex<Inner>,
}

impl Default for MemoryRegistrar {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryRegistrar {
    /// Registrar that refuses proofs below `min_difficulty`
    pub fn new(min_difficulty: u32) -> Self {
        Self {
            min_difficulty,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Fail the next `count` requests with a network error before looking at them
    pub fn fail_next(&self, count: u32) {
        self.inner.lock().outages = count;
    }

    /// Proofs received so far, including from failed attempts
    pub fn received_proofs(&self) -> Vec<ProofOfWorkResult> {
        self.inner.lock().received.clone()
    }

    /// Number of registered accounts
    pub fn account_count(&self) -> usize {
        self.inner.lock().accounts.len()
    }

    /// Account registered under `public_id`, if any
    pub fn account(&self, public_id: &str) -> Option<RegisteredAccount> {
        self.inner
            .lock()
            .accounts
            .get(public_id)
            .map(|stored| stored.account.clone())
    }

    /// Whether `phrase` hashes to the digest stored for `public_id`
    pub fn seed_phrase_matches(&self, public_id: &str, phrase: &str) -> bool {
        self.inner
            .lock()
            .accounts
            .get(public_id)
            .map(|stored| stored.seed_phrase_digest == sha256_hex(phrase.as_bytes()))
            .unwrap_or(false)
    }

    fn check(&self, request: &RegistrationRequest) -> ProvisionResult<()> {
        let pow = &request.proof_of_work;
        if pow.difficulty < self.min_difficulty {
            return Err(ProvisionError::RegistrationRejected(format!(
                "proof-of-work difficulty {} below required {}",
                pow.difficulty, self.min_difficulty
            )));
        }
        if !pow.verify(&request.public_id) {
            return Err(ProvisionError::RegistrationRejected(
                "proof-of-work does not verify".into(),
            ));
        }
        request
            .verify_signature()
            .map_err(|e| ProvisionError::RegistrationRejected(e.to_string()))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl Registrar for MemoryRegistrar {
    async fn register(&self, request: &RegistrationRequest) -> ProvisionResult<RegisteredAccount> {
        {
            let mut inner = self.inner.lock();
            inner.received.push(request.proof_of_work.clone());
            if inner.outages > 0 {
                inner.outages -= 1;
                warn!(remaining = inner.outages, "Simulated registration outage");
                return Err(ProvisionError::Network("registration service unreachable".into()));
            }
        }

        if let Err(e) = self.check(request) {
            debug!(public_id = %request.public_id, error = %e, "Registration refused");
            return Err(e);
        }

        let mut inner = self.inner.lock();
        if inner.accounts.contains_key(&request.public_id) {
            return Err(ProvisionError::RegistrationRejected(
                "public id already registered".into(),
            ));
        }

        inner.ledger_height += 1;
        let account = RegisteredAccount {
            user_id: ulid::Ulid::new().to_string(),
            public_key_hash: sha256_hex(request.public_id.as_bytes()),
            account_status: "active".to_string(),
            ledger_block_id: format!("blk_{:08}", inner.ledger_height),
        };
        let seed_phrase_digest = sha256_hex(request.seed_phrase.to_string().as_bytes());
        inner.accounts.insert(
            request.public_id.clone(),
            StoredAccount {
                account: account.clone(),
                seed_phrase_digest,
            },
        );

        info!(user_id = %account.user_id, block = %account.ledger_block_id, "Registered account in memory");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KeyPair;
    use crate::mnemonic::MnemonicEncoder;
    use crate::pow::{Challenge, PowParams, PowSolver};
    use crate::provision::{AccountDraft, ProfileConfig};
    use tokio_util::sync::CancellationToken;

    fn request(seed: u8, difficulty: u32) -> RegistrationRequest {
        let keypair = KeyPair::from_seed(&[seed; 32]).unwrap();
        let phrase = MnemonicEncoder::embedded().unwrap().encode(&[seed; 16]);
        let pow = PowSolver::new(PowParams {
            difficulty,
            max_iterations: 1_000_000,
            chunk_size: 1_000,
        })
        .unwrap()
        .solve_blocking(
            &Challenge::at(keypair.public_id(), 1_700_000_000_000),
            &CancellationToken::new(),
            |_| {},
        )
        .unwrap();
        AccountDraft::sign(&keypair, &phrase, &pow, &ProfileConfig::default())
            .unwrap()
            .to_request()
    }

    #[tokio::test]
    async fn test_registers_valid_request() {
        let registrar = MemoryRegistrar::new(1);
        let req = request(1, 1);
        let account = registrar.register(&req).await.unwrap();

        assert_eq!(account.account_status, "active");
        assert_eq!(account.ledger_block_id, "blk_00000001");
        assert_eq!(account.public_key_hash, sha256_hex(req.public_id.as_bytes()));
        assert_eq!(registrar.account(&req.public_id), Some(account));
        assert!(registrar.seed_phrase_matches(&req.public_id, &req.seed_phrase.to_string()));
        assert!(!registrar.seed_phrase_matches(&req.public_id, "wrong phrase"));
    }

    #[tokio::test]
    async fn test_rejects_duplicate() {
        let registrar = MemoryRegistrar::default();
        let req = request(2, 1);
        registrar.register(&req).await.unwrap();
        let err = registrar.register(&req).await.unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registrar.account_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_forged_proof() {
        let registrar = MemoryRegistrar::default();
        let mut req = request(3, 1);
        req.proof_of_work.hash = "0".repeat(64);
        let err = registrar.register(&req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::RegistrationRejected(_)));
    }

    #[tokio::test]
    async fn test_rejects_weak_proof() {
        let registrar = MemoryRegistrar::new(3);
        let err = registrar.register(&request(4, 1)).await.unwrap_err();
        assert!(err.to_string().contains("below required"));
    }

    #[tokio::test]
    async fn test_rejects_bad_signature() {
        let registrar = MemoryRegistrar::default();
        let mut req = request(5, 1);
        req.agent_config.verbosity = 1;
        let err = registrar.register(&req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::RegistrationRejected(_)));
    }

    #[tokio::test]
    async fn test_rejects_public_id_not_matching_key() {
        let registrar = MemoryRegistrar::default();
        let mut req = request(7, 1);
        req.public_key = KeyPair::from_seed(&[8u8; 32]).unwrap().public_key_hex();
        let err = registrar.register(&req).await.unwrap_err();
        assert!(err.to_string().contains("does not match public key"));
        assert_eq!(registrar.account_count(), 0);
    }

    #[tokio::test]
    async fn test_simulated_outage() {
        let registrar = MemoryRegistrar::default();
        registrar.fail_next(1);
        let req = request(6, 1);

        let err = registrar.register(&req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Network(_)));
        registrar.register(&req).await.unwrap();
        assert_eq!(registrar.received_proofs().len(), 2);
    }
}
