//! Seed phrase generation
//!
//! Sixteen bytes of entropy become twelve words from a fixed word list.
//! Word `i` is chosen by `(e[i] + (e[(i + 4) % 16] << 8)) mod W`.
//!
//! The phrase is a backup aid, not a recovery scheme: there is no checksum
//! word and no way back from words to entropy or to the keypair.

mod phrase;
mod wordlist;

pub use phrase::{MnemonicEncoder, SeedPhrase, ENTROPY_BYTES, PHRASE_WORDS};
pub use wordlist::{Wordlist, MIN_WORDLIST_LEN};
