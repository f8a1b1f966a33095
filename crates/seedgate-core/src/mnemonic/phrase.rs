//! Seed phrase type and the entropy-to-words encoder

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::wordlist::Wordlist;
use crate::entropy::{os_entropy, EntropySource};
use crate::error::{ProvisionError, ProvisionResult};

/// Words in every seed phrase
pub const PHRASE_WORDS: usize = 12;

/// Bytes of entropy behind every seed phrase
pub const ENTROPY_BYTES: usize = 16;

/// Ordered sequence of twelve words.
///
/// Word order matters. `Display` yields the space-separated phrase for the
/// user to write down; `Debug` never shows the words.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedPhrase {
    words: Vec<String>,
}

impl SeedPhrase {
    /// Parse a user-typed phrase, checking length and word membership.
    ///
    /// Whitespace is normalized and case is folded before the check.
    pub fn parse(text: &str, wordlist: &Wordlist) -> ProvisionResult<Self> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect();

        if words.len() != PHRASE_WORDS {
            return Err(ProvisionError::PhraseMismatch(format!(
                "expected {} words, got {}",
                PHRASE_WORDS,
                words.len()
            )));
        }
        if let Some(pos) = words.iter().position(|w| !wordlist.contains(w)) {
            return Err(ProvisionError::PhraseMismatch(format!(
                "word {} is not in the word list",
                pos + 1
            )));
        }

        Ok(Self { words })
    }

    /// The words in order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words (always [`PHRASE_WORDS`])
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a constructed phrase
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Check a phrase typed back by the user against this one.
    ///
    /// The error names only the first wrong position, never the expected word.
    pub fn confirm(&self, typed: &str) -> ProvisionResult<()> {
        let typed: Vec<String> = typed
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect();
        if typed.len() != self.words.len() {
            return Err(ProvisionError::PhraseMismatch(format!(
                "expected {} words, got {}",
                self.words.len(),
                typed.len()
            )));
        }
        match self.words.iter().zip(&typed).position(|(a, b)| a != b) {
            Some(pos) => Err(ProvisionError::PhraseMismatch(format!(
                "word {} does not match",
                pos + 1
            ))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for SeedPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.words.join(" "))
    }
}

impl std::fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedPhrase")
            .field("words", &format_args!("[{} redacted]", self.words.len()))
            .finish()
    }
}

impl Serialize for SeedPhrase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeedPhrase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if words.len() != PHRASE_WORDS {
            return Err(serde::de::Error::invalid_length(
                words.len(),
                &"a twelve-word seed phrase",
            ));
        }
        Ok(Self { words })
    }
}

/// Turns entropy into seed phrases over a fixed word list.
#[derive(Clone)]
pub struct MnemonicEncoder {
    wordlist: Arc<Wordlist>,
    entropy: Arc<dyn EntropySource>,
}

impl MnemonicEncoder {
    /// Encoder over `wordlist` drawing from the OS RNG
    pub fn new(wordlist: Arc<Wordlist>) -> Self {
        Self::with_entropy(wordlist, os_entropy())
    }

    /// Encoder over `wordlist` drawing from a specific entropy source
    pub fn with_entropy(wordlist: Arc<Wordlist>, entropy: Arc<dyn EntropySource>) -> Self {
        Self { wordlist, entropy }
    }

    /// Encoder over the built-in word list
    pub fn embedded() -> ProvisionResult<Self> {
        Ok(Self::new(Wordlist::embedded()?))
    }

    /// The word list in use
    pub fn wordlist(&self) -> &Arc<Wordlist> {
        &self.wordlist
    }

    /// Draw fresh entropy and encode it.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::EntropyUnavailable` if the entropy source fails.
    pub fn generate(&self) -> ProvisionResult<SeedPhrase> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        self.entropy
            .try_fill(&mut entropy)
            .map_err(|e| ProvisionError::EntropyUnavailable(e.to_string()))?;
        let phrase = self.encode(&entropy);
        entropy.fill(0);
        debug!(words = phrase.len(), "Generated seed phrase");
        Ok(phrase)
    }

    /// Deterministically map 16 entropy bytes to 12 words.
    ///
    /// Word `i` is `wordlist[(e[i] + (e[(i + 4) % 16] << 8)) % W]`.
    pub fn encode(&self, entropy: &[u8; ENTROPY_BYTES]) -> SeedPhrase {
        let w = self.wordlist.len();
        let words = (0..PHRASE_WORDS)
            .map(|i| {
                let low = entropy[i] as usize;
                let high = (entropy[(i + 4) % ENTROPY_BYTES] as usize) << 8;
                let index = (low + high) % w;
                // index < W by construction
                self.wordlist.get(index).unwrap_or_default().to_string()
            })
            .collect();
        SeedPhrase { words }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::testing::{FixedEntropy, UnavailableEntropy};

    fn encoder() -> MnemonicEncoder {
        MnemonicEncoder::embedded().unwrap()
    }

    #[test]
    fn test_generate_has_twelve_listed_words() {
        let encoder = encoder();
        let phrase = encoder.generate().unwrap();
        assert_eq!(phrase.len(), PHRASE_WORDS);
        assert!(phrase.words().iter().all(|w| encoder.wordlist().contains(w)));
    }

    #[test]
    fn test_zero_entropy_selects_first_word() {
        let phrase = encoder().encode(&[0u8; ENTROPY_BYTES]);
        assert!(phrase.words().iter().all(|w| w == "abandon"));
    }

    #[test]
    fn test_index_formula() {
        let encoder = encoder();
        let w = encoder.wordlist().len();
        let mut entropy = [0u8; ENTROPY_BYTES];
        for (i, byte) in entropy.iter_mut().enumerate() {
            *byte = (i * 17) as u8;
        }
        let phrase = encoder.encode(&entropy);
        for i in 0..PHRASE_WORDS {
            let expected = (entropy[i] as usize + ((entropy[(i + 4) % 16] as usize) << 8)) % w;
            assert_eq!(phrase.words()[i], encoder.wordlist().get(expected).unwrap());
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = encoder();
        let entropy = [0xA5u8; ENTROPY_BYTES];
        assert_eq!(encoder.encode(&entropy), encoder.encode(&entropy));
    }

    #[test]
    fn test_fixed_entropy_matches_encode() {
        let list = Wordlist::embedded().unwrap();
        let encoder = MnemonicEncoder::with_entropy(list, Arc::new(FixedEntropy(vec![1, 2, 3])));
        let mut expected = [0u8; ENTROPY_BYTES];
        for (i, byte) in expected.iter_mut().enumerate() {
            *byte = [1, 2, 3][i % 3];
        }
        assert_eq!(encoder.generate().unwrap(), encoder.encode(&expected));
    }

    #[test]
    fn test_unavailable_entropy_fails() {
        let list = Wordlist::embedded().unwrap();
        let encoder = MnemonicEncoder::with_entropy(list, Arc::new(UnavailableEntropy));
        assert!(matches!(
            encoder.generate().unwrap_err(),
            ProvisionError::EntropyUnavailable(_)
        ));
    }

    #[test]
    fn test_debug_redacts_words() {
        let phrase = encoder().encode(&[0u8; ENTROPY_BYTES]);
        let debug = format!("{:?}", phrase);
        assert!(!debug.contains("abandon"));
        assert!(debug.contains("12 redacted"));
    }

    #[test]
    fn test_confirm() {
        let phrase = encoder().encode(&[7u8; ENTROPY_BYTES]);
        let text = phrase.to_string();
        phrase.confirm(&text).unwrap();
        phrase.confirm(&text.to_uppercase()).unwrap();

        let mut words: Vec<&str> = text.split(' ').collect();
        words.swap(0, 1);
        if words[0] != words[1] {
            let err = phrase.confirm(&words.join(" ")).unwrap_err();
            assert!(err.to_string().contains("word 1"));
        }
        assert!(phrase.confirm("too short").is_err());
    }

    #[test]
    fn test_parse_validates_membership() {
        let encoder = encoder();
        let phrase = encoder.encode(&[9u8; ENTROPY_BYTES]);
        let parsed = SeedPhrase::parse(&phrase.to_string(), encoder.wordlist()).unwrap();
        assert_eq!(parsed, phrase);

        let bogus = vec!["notaword"; PHRASE_WORDS].join(" ");
        assert!(SeedPhrase::parse(&bogus, encoder.wordlist()).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let phrase = encoder().encode(&[0u8; ENTROPY_BYTES]);
        let json = serde_json::to_string(&phrase).unwrap();
        assert!(json.starts_with("\"abandon abandon"));
        let back: SeedPhrase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phrase);
        assert!(serde_json::from_str::<SeedPhrase>("\"one two\"").is_err());
    }
}
