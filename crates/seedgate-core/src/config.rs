//! Provisioning configuration
//!
//! Stored as `seedgate.json` in the data directory. Every field has a
//! default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProvisionError, ProvisionResult};
use crate::mnemonic::{MnemonicEncoder, Wordlist};
use crate::pow::{PowParams, PowSolver};
use crate::registration::HttpRegistrar;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "seedgate.json";

/// Default registration request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the CLI and the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Solver parameters
    pub pow: PowParams,
    /// Registration endpoint; `None` means offline only
    pub registration_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Custom word list; `None` uses the embedded one
    pub wordlist_path: Option<PathBuf>,
    /// Mirror logs to `<data_dir>/logs`
    pub log_to_file: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            pow: PowParams::default(),
            registration_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            wordlist_path: None,
            log_to_file: true,
        }
    }
}

/// `<platform data dir>/seedgate`, falling back to `./.seedgate`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("seedgate"))
        .unwrap_or_else(|| PathBuf::from(".seedgate"))
}

impl ProvisionConfig {
    /// Path of the config file inside `data_dir`
    pub fn path_in(data_dir: impl AsRef<Path>) -> PathBuf {
        data_dir.as_ref().join(CONFIG_FILE)
    }

    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ProvisionError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "No config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> ProvisionResult<()> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn validate(&self) -> ProvisionResult<()> {
        self.pow.validate()?;
        if self.request_timeout_secs == 0 {
            return Err(ProvisionError::Config(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if let Some(url) = &self.registration_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ProvisionError::Config(format!(
                    "registration_url must be http(s): {url}"
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured word list, or the embedded one
    pub fn wordlist(&self) -> ProvisionResult<Arc<Wordlist>> {
        match &self.wordlist_path {
            Some(path) => Ok(Arc::new(Wordlist::from_file(path)?)),
            None => Wordlist::embedded(),
        }
    }

    pub fn encoder(&self) -> ProvisionResult<MnemonicEncoder> {
        Ok(MnemonicEncoder::new(self.wordlist()?))
    }

    pub fn solver(&self) -> ProvisionResult<PowSolver> {
        PowSolver::new(self.pow)
    }

    /// HTTP registrar for `registration_url`.
    ///
    /// # Errors
    ///
    /// `Config` when no URL is configured.
    pub fn http_registrar(&self) -> ProvisionResult<HttpRegistrar> {
        let url = self
            .registration_url
            .as_deref()
            .ok_or_else(|| ProvisionError::Config("registration_url is not set".into()))?;
        HttpRegistrar::new(url, self.request_timeout())
    }
}
