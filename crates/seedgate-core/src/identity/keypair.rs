//! Account keypair and its display identifiers
//!
//! The account identity is an RSA-2048 key usable for OAEP (SHA-256)
//! encryption. Its public and private halves are exported in the standard
//! DER encodings (SubjectPublicKeyInfo and PKCS#8 PrivateKeyInfo),
//! hex-encoded, and cut to a fixed display length behind a role prefix.
//! Only the display strings are truncated; every operation uses the full key.
//!
//! An Ed25519 key generated alongside it signs the account draft.

use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, SecretDocument};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tracing::debug;

use crate::entropy::{os_entropy, EntropySource};
use crate::error::{ProvisionError, ProvisionResult};

/// Prefix for the shareable public identifier
pub const PUBLIC_ID_PREFIX: &str = "pk_";

/// Prefix for the private secret display string
pub const PRIVATE_SECRET_PREFIX: &str = "sk_";

/// Number of hex characters kept after the prefix
pub const DISPLAY_HEX_LEN: usize = 64;

/// Modulus size of the account key
pub const RSA_KEY_BITS: usize = 2048;

/// Account keypair.
///
/// Holds the full RSA key plus its DER exports, and the Ed25519 signing key.
/// `Debug` only ever shows the public identifier.
#[derive(Clone)]
pub struct KeyPair {
    encryption: RsaPrivateKey,
    /// DER SubjectPublicKeyInfo
    public_der: Vec<u8>,
    /// DER PKCS#8 PrivateKeyInfo (zeroized on drop)
    private_der: SecretDocument,
    signing: SigningKey,
}

impl KeyPair {
    /// Derive a keypair from a 32-byte seed.
    ///
    /// The same seed always yields the same keys.
    pub fn from_seed(seed: &[u8; 32]) -> ProvisionResult<Self> {
        let mut rng = ChaCha20Rng::from_seed(*seed);
        let encryption = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| ProvisionError::KeyGenUnavailable(format!("rsa keygen: {e}")))?;
        let signing = SigningKey::generate(&mut rng);

        let public_der = encryption
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| ProvisionError::KeyGenUnavailable(format!("public key export: {e}")))?
            .as_bytes()
            .to_vec();
        let private_der = encryption
            .to_pkcs8_der()
            .map_err(|e| ProvisionError::KeyGenUnavailable(format!("private key export: {e}")))?;

        Ok(Self {
            encryption,
            public_der,
            private_der,
            signing,
        })
    }

    /// Shareable identifier: `pk_` followed by the tail of the SPKI hex.
    ///
    /// The SPKI header is identical for every 2048-bit key, so the tail
    /// (end of the modulus and the exponent) is what tells keys apart.
    pub fn public_id(&self) -> String {
        display_id(PUBLIC_ID_PREFIX, &self.public_der)
    }

    /// Private display string: `sk_` followed by the tail of the PKCS#8 hex.
    ///
    /// Meant only for the user's own backup. Never log or transmit it.
    pub fn private_secret(&self) -> String {
        display_id(PRIVATE_SECRET_PREFIX, self.private_der.as_bytes())
    }

    /// Full DER SubjectPublicKeyInfo export
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_der
    }

    /// Full SPKI export, hex-encoded without truncation
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_der)
    }

    /// The RSA public key
    pub fn encryption_key(&self) -> RsaPublicKey {
        self.encryption.to_public_key()
    }

    /// Encrypt `message` to this identity with RSA-OAEP (SHA-256).
    ///
    /// Padding randomness is drawn from `entropy`.
    pub fn encrypt(&self, entropy: &dyn EntropySource, message: &[u8]) -> ProvisionResult<Vec<u8>> {
        let mut seed = [0u8; 32];
        entropy
            .try_fill(&mut seed)
            .map_err(|e| ProvisionError::EntropyUnavailable(e.to_string()))?;
        let mut rng = ChaCha20Rng::from_seed(seed);
        seed.fill(0);

        self.encryption
            .to_public_key()
            .encrypt(&mut rng, Oaep::new::<Sha256>(), message)
            .map_err(|e| ProvisionError::Crypto(format!("oaep encrypt: {e}")))
    }

    /// Decrypt an RSA-OAEP (SHA-256) ciphertext made for this identity
    pub fn decrypt(&self, ciphertext: &[u8]) -> ProvisionResult<Vec<u8>> {
        self.encryption
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| ProvisionError::Crypto(format!("oaep decrypt: {e}")))
    }

    /// The Ed25519 verifying key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Ed25519 verifying key, hex-encoded
    pub fn signing_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Sign a message with the Ed25519 key
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    /// Verify a signature made by this keypair
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing.verifying_key().verify(message, signature).is_ok()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_id", &self.public_id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_der == other.public_der && self.signing == other.signing
    }
}

impl Eq for KeyPair {}

fn display_id(prefix: &str, der: &[u8]) -> String {
    let encoded = hex::encode(der);
    let start = encoded.len().saturating_sub(DISPLAY_HEX_LEN);
    format!("{}{}", prefix, &encoded[start..])
}

/// Check that `public_key_hex` is a 2048-bit RSA SPKI whose display id is `public_id`.
pub fn check_public_id(public_id: &str, public_key_hex: &str) -> ProvisionResult<()> {
    let der = hex::decode(public_key_hex)
        .map_err(|e| ProvisionError::SignatureInvalid(format!("public key not hex: {e}")))?;
    let key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| ProvisionError::SignatureInvalid(format!("public key not RSA SPKI: {e}")))?;
    if key.size() * 8 != RSA_KEY_BITS {
        return Err(ProvisionError::SignatureInvalid(format!(
            "public key is {} bits, expected {RSA_KEY_BITS}",
            key.size() * 8
        )));
    }
    if display_id(PUBLIC_ID_PREFIX, &der) != public_id {
        return Err(ProvisionError::SignatureInvalid(
            "public id does not match public key".into(),
        ));
    }
    Ok(())
}

/// Parse a hex-encoded Ed25519 verifying key.
pub fn verifying_key_from_hex(signing_key_hex: &str) -> ProvisionResult<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(signing_key_hex)
        .map_err(|e| ProvisionError::SignatureInvalid(format!("signing key not hex: {e}")))?
        .try_into()
        .map_err(|_| ProvisionError::SignatureInvalid("signing key has wrong length".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ProvisionError::SignatureInvalid("signing key is not a valid key".into()))
}

/// Verify a hex-encoded Ed25519 signature against a hex-encoded verifying key.
pub fn verify_with_signing_key(
    signing_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> ProvisionResult<()> {
    let key = verifying_key_from_hex(signing_key_hex)?;
    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| ProvisionError::SignatureInvalid(format!("signature not hex: {e}")))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|_| ProvisionError::SignatureInvalid("signature has wrong length".into()))?;
    key.verify(message, &signature)
        .map_err(|_| ProvisionError::SignatureInvalid("signature does not match".into()))
}

/// Produces fresh account keypairs.
#[derive(Clone)]
pub struct KeyPairGenerator {
    entropy: Arc<dyn EntropySource>,
}

impl Default for KeyPairGenerator {
    fn default() -> Self {
        Self::new(os_entropy())
    }
}

impl KeyPairGenerator {
    /// Create a generator drawing from the given entropy source
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self { entropy }
    }

    /// Generate a new random keypair.
    ///
    /// RSA prime search is CPU-bound; async callers on a busy runtime may
    /// want to run this under `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::KeyGenUnavailable` if the entropy source
    /// cannot produce a seed.
    pub fn generate(&self) -> ProvisionResult<KeyPair> {
        let mut seed = [0u8; 32];
        self.entropy
            .try_fill(&mut seed)
            .map_err(|e| ProvisionError::KeyGenUnavailable(e.to_string()))?;
        let keypair = KeyPair::from_seed(&seed);
        seed.fill(0);

        let keypair = keypair?;
        debug!(public_id = %keypair.public_id(), "Generated keypair");
        Ok(keypair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::testing::{FixedEntropy, UnavailableEntropy};

    #[test]
    fn test_identifiers_have_prefix_and_length() {
        let keypair = KeyPairGenerator::default().generate().unwrap();
        let public_id = keypair.public_id();
        let secret = keypair.private_secret();

        assert!(public_id.starts_with("pk_"));
        assert!(secret.starts_with("sk_"));
        assert_eq!(public_id.len(), 3 + DISPLAY_HEX_LEN);
        assert_eq!(secret.len(), 3 + DISPLAY_HEX_LEN);
        assert_ne!(public_id[3..], secret[3..]);
    }

    #[test]
    fn test_key_is_rsa_2048() {
        let keypair = KeyPair::from_seed(&[7u8; 32]).unwrap();
        assert_eq!(keypair.encryption_key().size(), 256);
        // 2048-bit SPKI: 24 header bytes, 256-byte modulus, 3-byte exponent
        assert_eq!(keypair.public_key_der().len(), 294);
        assert!(keypair.public_key_hex().ends_with("0203010001"));
        assert!(keypair.public_key_hex().ends_with(&keypair.public_id()[3..]));
    }

    #[test]
    fn test_private_secret_is_pkcs8_tail() {
        let keypair = KeyPair::from_seed(&[9u8; 32]).unwrap();
        let full = hex::encode(keypair.private_der.as_bytes());
        assert!(full.len() > DISPLAY_HEX_LEN);
        assert!(full.ends_with(&keypair.private_secret()[3..]));
    }

    #[test]
    fn test_check_public_id() {
        let keypair = KeyPair::from_seed(&[9u8; 32]).unwrap();
        check_public_id(&keypair.public_id(), &keypair.public_key_hex()).unwrap();

        let other = KeyPair::from_seed(&[10u8; 32]).unwrap();
        assert!(check_public_id(&other.public_id(), &keypair.public_key_hex()).is_err());
        assert!(check_public_id(&keypair.public_id(), "zz").is_err());
    }

    #[test]
    fn test_oaep_roundtrip() {
        let keypair = KeyPair::from_seed(&[4u8; 32]).unwrap();
        let ciphertext = keypair.encrypt(&FixedEntropy(vec![1, 2, 3]), b"recovery note").unwrap();
        assert_eq!(ciphertext.len(), 256);
        assert_eq!(keypair.decrypt(&ciphertext).unwrap(), b"recovery note");

        let other = KeyPair::from_seed(&[5u8; 32]).unwrap();
        assert!(other.decrypt(&ciphertext).is_err());
        assert!(matches!(
            keypair.encrypt(&UnavailableEntropy, b"x").unwrap_err(),
            ProvisionError::EntropyUnavailable(_)
        ));
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = KeyPair::from_seed(&[42u8; 32]).unwrap();
        let b = KeyPair::from_seed(&[42u8; 32]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.private_secret(), b.private_secret());
    }

    #[test]
    fn test_two_generations_differ() {
        let generator = KeyPairGenerator::default();
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_ne!(a.public_id(), b.public_id());
    }

    #[test]
    fn test_unavailable_entropy_fails() {
        let generator = KeyPairGenerator::new(Arc::new(UnavailableEntropy));
        let err = generator.generate().unwrap_err();
        assert!(matches!(err, ProvisionError::KeyGenUnavailable(_)));
    }

    #[test]
    fn test_fixed_entropy_gives_fixed_key() {
        let generator = KeyPairGenerator::new(Arc::new(FixedEntropy(vec![3u8])));
        let a = generator.generate().unwrap();
        let b = KeyPair::from_seed(&[3u8; 32]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = KeyPair::from_seed(&[1u8; 32]).unwrap();
        let debug = format!("{:?}", keypair);
        assert!(debug.contains(&keypair.public_id()));
        assert!(!debug.contains(&keypair.private_secret()[3..]));
    }

    #[test]
    fn test_sign_verify_with_hex_key() {
        let keypair = KeyPair::from_seed(&[5u8; 32]).unwrap();
        let message = b"account draft";
        let signature = keypair.sign(message);
        assert!(keypair.verify(message, &signature));
        assert!(!keypair.verify(b"tampered draft", &signature));

        let sig_hex = hex::encode(signature.to_bytes());
        verify_with_signing_key(&keypair.signing_key_hex(), message, &sig_hex).unwrap();
        let other = KeyPair::from_seed(&[6u8; 32]).unwrap();
        assert!(verify_with_signing_key(&other.signing_key_hex(), message, &sig_hex).is_err());
        assert!(verify_with_signing_key("nope", message, &sig_hex).is_err());
    }
}
