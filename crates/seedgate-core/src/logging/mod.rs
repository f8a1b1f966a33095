//! JSONL logging for provisioning runs.
//!
//! Console output goes to stderr. When enabled, every event is also appended
//! to `<data_dir>/logs/<date>_<instance>.jsonl`, with the fields named in
//! [`REDACTED_FIELDS`] replaced before they are written.
//!
//! ```ignore
//! use seedgate_core::logging::LoggingBuilder;
//!
//! let log_file = LoggingBuilder::new(cli.verbose)
//!     .with_jsonl(data_dir.join("logs"), "wizard")
//!     .init()?;
//! ```
//!
//! Querying with jq:
//!
//! ```bash
//! jq 'select(.level == "warn")' ~/.local/share/seedgate/logs/*.jsonl
//! ```

pub mod entry;
pub mod layer;
pub mod writer;

pub use entry::LogEntry;
pub use layer::{verbosity_filter, JsonlLayer, LoggingBuilder, REDACTED_FIELDS};
pub use writer::{read_entries, LogWriter};
