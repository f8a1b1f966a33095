//! Provisioning flow
//!
//! - `stage` holds the stage enum and the pure transition function.
//! - `draft` holds profile settings and the signed account draft.
//! - [`ProvisioningOrchestrator`] performs each step and applies its outcome.

mod draft;
mod orchestrator;
mod stage;

pub use draft::{AccountDraft, AgentConfig, AgentTone, ProfileConfig, ProfileVisibility};
pub use orchestrator::{ProvisioningOrchestrator, RegistrationStatus, LOCAL_ONLY_NOTICE};
pub use stage::{Artifacts, ProvisionEvent, ProvisionState, Stage};
