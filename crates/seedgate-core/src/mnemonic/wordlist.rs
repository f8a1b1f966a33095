//! Ordered, deduplicated word list backing the seed phrase.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::error::{ProvisionError, ProvisionResult};

/// Smallest word list accepted
pub const MIN_WORDLIST_LEN: usize = 256;

/// Built-in word list, one word per line
const EMBEDDED_WORDS: &str = include_str!("../../assets/wordlist.txt");

static EMBEDDED: OnceLock<Arc<Wordlist>> = OnceLock::new();

/// Ordered list of unique words.
///
/// The order is part of the encoding: index `n` in the mnemonic formula
/// always selects `words[n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wordlist {
    words: Vec<String>,
    lookup: HashSet<String>,
}

impl Wordlist {
    /// The word list compiled into the binary, parsed once per process.
    pub fn embedded() -> ProvisionResult<Arc<Self>> {
        if let Some(list) = EMBEDDED.get() {
            return Ok(list.clone());
        }
        let list = Arc::new(Self::parse(EMBEDDED_WORDS)?);
        Ok(EMBEDDED.get_or_init(|| list).clone())
    }

    /// Load a word list file (one word per line, `#` starts a comment line).
    pub fn from_file(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Wordlist(format!("cannot read {}: {}", path.display(), e))
        })?;
        let list = Self::parse(&text)?;
        info!(path = %path.display(), words = list.len(), "Loaded word list");
        Ok(list)
    }

    /// Parse and validate a word list.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Wordlist` if a word is not lowercase ASCII,
    /// a word repeats, or fewer than [`MIN_WORDLIST_LEN`] words remain.
    pub fn parse(text: &str) -> ProvisionResult<Self> {
        let mut words = Vec::new();
        let mut lookup = HashSet::new();

        for (line_no, line) in text.lines().enumerate() {
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            if !word.bytes().all(|b| b.is_ascii_lowercase()) {
                return Err(ProvisionError::Wordlist(format!(
                    "line {}: '{}' is not a lowercase ASCII word",
                    line_no + 1,
                    word
                )));
            }
            if !lookup.insert(word.to_string()) {
                return Err(ProvisionError::Wordlist(format!(
                    "line {}: duplicate word '{}'",
                    line_no + 1,
                    word
                )));
            }
            words.push(word.to_string());
        }

        if words.len() < MIN_WORDLIST_LEN {
            return Err(ProvisionError::Wordlist(format!(
                "{} words found, at least {} required",
                words.len(),
                MIN_WORDLIST_LEN
            )));
        }

        debug!(words = words.len(), "Parsed word list");
        Ok(Self { words, lookup })
    }

    /// Number of words (`W` in the index formula)
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a validated list
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `index`, if in range
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Whether `word` belongs to the list
    pub fn contains(&self, word: &str) -> bool {
        self.lookup.contains(word)
    }

    /// Iterate words in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        // letters only: encode the number in base 26
        (0..n)
            .map(|mut i| {
                let mut word = String::from("w");
                loop {
                    word.push((b'a' + (i % 26) as u8) as char);
                    i /= 26;
                    if i == 0 {
                        break;
                    }
                }
                word
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_embedded_list_is_valid() {
        let list = Wordlist::embedded().unwrap();
        assert!(list.len() >= MIN_WORDLIST_LEN);
        assert_eq!(list.get(0), Some("abandon"));
        assert!(list.contains("zero"));
    }

    #[test]
    fn test_embedded_is_shared() {
        let a = Wordlist::embedded().unwrap();
        let b = Wordlist::embedded().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = format!("# header\n\n{}\n\n", numbered_words(300));
        let list = Wordlist::parse(&text).unwrap();
        assert_eq!(list.len(), 300);
    }

    #[test]
    fn test_duplicate_rejected() {
        let text = format!("{}\nwa", numbered_words(300));
        let err = Wordlist::parse(&text).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_too_short_rejected() {
        let err = Wordlist::parse(&numbered_words(10)).unwrap_err();
        assert!(matches!(err, ProvisionError::Wordlist(_)));
    }

    #[test]
    fn test_non_lowercase_rejected() {
        let text = format!("{}\nHello", numbered_words(300));
        assert!(Wordlist::parse(&text).is_err());
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("words.txt");
        std::fs::write(&path, numbered_words(512)).unwrap();

        let list = Wordlist::from_file(&path).unwrap();
        assert_eq!(list.len(), 512);
        assert_eq!(list.get(0), Some("wa"));

        assert!(Wordlist::from_file(temp.path().join("missing.txt")).is_err());
    }
}
