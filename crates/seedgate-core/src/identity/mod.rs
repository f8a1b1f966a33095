//! Identity module for seedgate
//!
//! Local generation of the account keypair and its display identifiers.
//! The account key is RSA-2048 (OAEP, SHA-256); a companion Ed25519 key
//! signs the account draft.
//!
//! ## Example
//!
//! ```rust
//! use seedgate_core::identity::KeyPairGenerator;
//!
//! let keypair = KeyPairGenerator::default().generate().unwrap();
//! println!("Public id: {}", keypair.public_id());
//!
//! let signature = keypair.sign(b"draft");
//! assert!(keypair.verify(b"draft", &signature));
//! ```
//!
//! ## Handling the secret
//!
//! `KeyPair::private_secret()` is for the user's own backup only. Nothing in
//! this crate logs it, serializes it, or sends it over the network.

mod keypair;

pub use keypair::{
    check_public_id, verify_with_signing_key, verifying_key_from_hex, KeyPair, KeyPairGenerator,
    DISPLAY_HEX_LEN, PRIVATE_SECRET_PREFIX, PUBLIC_ID_PREFIX, RSA_KEY_BITS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_identity_workflow() {
        let keypair = KeyPairGenerator::default().generate().unwrap();
        let public_id = keypair.public_id();

        let message = b"Integration test message";
        let sig_hex = hex::encode(keypair.sign(message).to_bytes());

        // Anyone holding the published keys can tie them to the public id
        // and check the signature
        check_public_id(&public_id, &keypair.public_key_hex()).unwrap();
        verify_with_signing_key(&keypair.signing_key_hex(), message, &sig_hex).unwrap();
        assert_eq!(
            verifying_key_from_hex(&keypair.signing_key_hex()).unwrap(),
            keypair.verifying_key()
        );
    }
}
