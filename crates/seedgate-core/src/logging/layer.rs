//! Tracing layer that mirrors events into a JSONL file, plus the subscriber
//! builder used by the binaries.

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use super::entry::LogEntry;
use super::writer::LogWriter;
use crate::error::{ProvisionError, ProvisionResult};

/// Field names whose values never reach the log file
pub const REDACTED_FIELDS: &[&str] = &["private_secret", "seed_phrase", "secret", "mnemonic"];

const REDACTED: &str = "[redacted]";

/// Writes every event to a JSONL file, redacting secret-bearing fields.
pub struct JsonlLayer {
    writer: Arc<LogWriter>,
}

impl JsonlLayer {
    pub fn new(logs_dir: impl AsRef<Path>, instance: impl Into<String>) -> std::io::Result<Self> {
        Ok(Self {
            writer: Arc::new(LogWriter::new(logs_dir, instance)?),
        })
    }

    pub fn log_path(&self) -> &Path {
        self.writer.path()
    }

    pub fn instance(&self) -> &str {
        self.writer.instance()
    }
}

impl<S> Layer<S> for JsonlLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);

        let mut entry = LogEntry::new(
            metadata.level().as_str().to_lowercase(),
            self.writer.instance(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        if !visitor.fields.is_empty() {
            entry = entry.with_fields(Value::Object(visitor.fields));
        }
        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                entry = entry.with_span(spans.join(" > "));
            }
        }

        // a failed log write must not take the process down
        let _ = self.writer.write(&entry);
    }
}

#[derive(Default)]
struct RedactingVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        let name = field.name();
        let value = if REDACTED_FIELDS.contains(&name) {
            Value::String(REDACTED.to_string())
        } else {
            value
        };
        self.fields.insert(name.to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{value:?}");
        if field.name() == "message" {
            self.message = Some(buf);
        } else {
            self.insert(field, Value::String(buf));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.insert(field, Value::Number(n));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

/// Map `-v` count to a default filter directive
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber: stderr console output, an `EnvFilter`,
/// and optionally a [`JsonlLayer`].
pub struct LoggingBuilder {
    verbosity: u8,
    filter: Option<String>,
    jsonl: Option<(PathBuf, String)>,
    console: bool,
}

impl LoggingBuilder {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            filter: None,
            jsonl: None,
            console: true,
        }
    }

    /// Explicit filter directive; takes precedence over `RUST_LOG`
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Also write JSONL to `<logs_dir>/<date>_<instance>.jsonl`
    pub fn with_jsonl(mut self, logs_dir: impl Into<PathBuf>, instance: impl Into<String>) -> Self {
        self.jsonl = Some((logs_dir.into(), instance.into()));
        self
    }

    pub fn no_console(mut self) -> Self {
        self.console = false;
        self
    }

    /// Filter the subscriber will use
    pub fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(self.verbosity))),
        }
    }

    /// Install as the global default. Returns the JSONL file path, if any.
    pub fn init(self) -> ProvisionResult<Option<PathBuf>> {
        let jsonl = match &self.jsonl {
            Some((dir, instance)) => Some(JsonlLayer::new(dir, instance)?),
            None => None,
        };
        let path = jsonl.as_ref().map(|layer| layer.log_path().to_path_buf());
        let console = self.console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        });

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(console)
            .with(jsonl)
            .try_init()
            .map_err(|e| ProvisionError::Config(format!("logging already initialized: {e}")))?;
        Ok(path)
    }
}
