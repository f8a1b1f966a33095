//! seedgate Core Library
//!
//! Anonymous account provisioning: a keypair and a seed phrase generated on
//! the device, a proof-of-work that rate-limits sign-ups, and a signed
//! account draft handed to a registration service.
//!
//! ## Overview
//!
//! - **identity**: Ed25519 keypair with `pk_` / `sk_` display identifiers
//! - **mnemonic**: 12-word backup phrase from 16 bytes of entropy
//! - **pow**: SHA-256 leading-zero puzzle, solved off the caller's thread
//! - **provision**: the stage machine and the orchestrator that drives it
//! - **registration**: the service boundary (HTTP or in-memory)
//!
//! Nothing here writes the private secret or the seed phrase to disk or to
//! the logs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use seedgate_core::{MemoryRegistrar, PowParams, PowSolver, ProfileConfig, ProvisioningOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let solver = PowSolver::new(PowParams::default())?;
//!     let mut orch = ProvisioningOrchestrator::new(MemoryRegistrar::default(), solver)?;
//!
//!     let keypair = orch.generate_identity()?;
//!     println!("{}", keypair.public_id());
//!     println!("{}", orch.seed_phrase().unwrap());
//!
//!     orch.confirm_backup(None)?;
//!     orch.solve_pow().await?;
//!     orch.choose_profile(ProfileConfig::default())?;
//!     let account = orch.submit().await?;
//!     println!("registered as {}", account.user_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entropy;
pub mod error;
pub mod identity;
pub mod logging;
pub mod mnemonic;
pub mod pow;
pub mod provision;
pub mod registration;

// Re-exports
pub use config::{default_data_dir, ProvisionConfig, CONFIG_FILE};
pub use entropy::{os_entropy, EntropySource, OsEntropy};
pub use error::{ProvisionError, ProvisionResult};
pub use identity::{KeyPair, KeyPairGenerator};
pub use mnemonic::{MnemonicEncoder, SeedPhrase, Wordlist};
pub use pow::{Challenge, PowParams, PowSolver, PowStatus, PowTask, ProofOfWorkResult};
pub use provision::{
    AccountDraft, AgentConfig, AgentTone, ProfileConfig, ProfileVisibility, ProvisionEvent,
    ProvisionState, ProvisioningOrchestrator, RegistrationStatus, Stage, LOCAL_ONLY_NOTICE,
};
pub use registration::{
    HttpRegistrar, MemoryRegistrar, RegisteredAccount, Registrar, RegistrationRequest,
    RegistrationResponse,
};
