//! Property-based tests for identity, mnemonic and proof-of-work invariants

use proptest::prelude::*;
use seedgate_core::identity::{KeyPair, DISPLAY_HEX_LEN};
use seedgate_core::mnemonic::{MnemonicEncoder, SeedPhrase, PHRASE_WORDS};
use seedgate_core::pow::{hash_attempt, leading_zeros, Challenge, PowParams, PowSolver, PowStatus};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Strategy Generators
// ============================================================================

fn entropy_strategy() -> impl Strategy<Value = [u8; 16]> {
    prop::array::uniform16(any::<u8>())
}

fn seed_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

fn public_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("pk_[0-9a-f]{8,64}").expect("valid regex")
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// The same entropy always yields the same 12 listed words
    #[test]
    fn mnemonic_is_deterministic_and_listed(entropy in entropy_strategy()) {
        let encoder = MnemonicEncoder::embedded().unwrap();
        let phrase = encoder.encode(&entropy);

        prop_assert_eq!(phrase.len(), PHRASE_WORDS);
        for word in phrase.words() {
            prop_assert!(encoder.wordlist().contains(word));
        }
        prop_assert_eq!(&encoder.encode(&entropy), &phrase);

        // what the user writes down parses back to the same phrase
        let reparsed = SeedPhrase::parse(&phrase.to_string(), encoder.wordlist()).unwrap();
        prop_assert_eq!(reparsed, phrase);
    }

    /// Word i depends only on bytes i and (i + 4) % 16
    #[test]
    fn mnemonic_word_uses_two_bytes(entropy in entropy_strategy(), i in 0usize..12) {
        let encoder = MnemonicEncoder::embedded().unwrap();
        let w = encoder.wordlist().len();
        let index = (entropy[i] as usize + ((entropy[(i + 4) % 16] as usize) << 8)) % w;
        let phrase = encoder.encode(&entropy);
        prop_assert_eq!(phrase.words()[i].as_str(), encoder.wordlist().get(index).unwrap());
    }

    /// A returned proof re-hashes to its recorded hash and meets its difficulty
    #[test]
    fn pow_result_verifies(public_id in public_id_strategy(), created in 0i64..4_000_000_000_000, difficulty in 0u32..=2) {
        let solver = PowSolver::new(PowParams {
            difficulty,
            max_iterations: 50_000,
            chunk_size: 500,
        })
        .unwrap();
        let challenge = Challenge::at(public_id.clone(), created);

        if let Ok(result) = solver.solve_blocking(&challenge, &CancellationToken::new(), |_| {}) {
            prop_assert_eq!(hash_attempt(&challenge.seed(), result.nonce), result.hash.clone());
            prop_assert!(leading_zeros(&result.hash) >= difficulty as usize);
            prop_assert_eq!(result.timestamp, created);
            prop_assert!(result.verify(&public_id));
        }
    }

    /// Progress never decreases and only success reports completion
    #[test]
    fn pow_progress_is_monotonic(created in 0i64..1_000_000, chunk in 1u64..200) {
        let solver = PowSolver::new(PowParams {
            difficulty: 3,
            max_iterations: 2_000,
            chunk_size: chunk,
        })
        .unwrap();
        let mut seen = Vec::new();
        let _ = solver.solve_blocking(
            &Challenge::at("pk_prop", created),
            &CancellationToken::new(),
            |status| seen.push(status.clone()),
        );

        for pair in seen.windows(2) {
            prop_assert!(pair[0].progress() <= pair[1].progress());
        }
        for status in &seen {
            if !matches!(status, PowStatus::Success(_)) {
                prop_assert!(status.progress() < 1.0);
            }
        }
    }
}

proptest! {
    // every case is a full RSA-2048 key generation
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Display identifiers are prefixed, fixed length, and distinct
    #[test]
    fn keypair_identifiers(seed in seed_strategy()) {
        let keypair = KeyPair::from_seed(&seed).unwrap();
        let public_id = keypair.public_id();
        let secret = keypair.private_secret();

        prop_assert!(public_id.starts_with("pk_"));
        prop_assert!(secret.starts_with("sk_"));
        prop_assert_eq!(public_id.len(), 3 + DISPLAY_HEX_LEN);
        prop_assert_ne!(&public_id[3..], &secret[3..]);
    }
}
