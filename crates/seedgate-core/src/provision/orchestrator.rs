//! ProvisioningOrchestrator - drives one account attempt end to end
//!
//! The orchestrator owns the generators, the solver, and a [`Registrar`].
//! Each operation does its work and then feeds the outcome into
//! [`ProvisionState::apply`], so the stage rules live in one place.
//!
//! # Example
//!
//! ```ignore
//! use seedgate_core::{MemoryRegistrar, ProfileConfig, ProvisioningOrchestrator};
//!
//! let mut orch = ProvisioningOrchestrator::new(MemoryRegistrar::default(), solver)?;
//! orch.generate_identity()?;
//! orch.confirm_backup(None)?;
//! orch.solve_pow().await?;
//! orch.choose_profile(ProfileConfig::default())?;
//! let account = orch.submit().await?;
//! ```

use tracing::{debug, info, warn};

use super::draft::{AccountDraft, ProfileConfig};
use super::stage::{ProvisionEvent, ProvisionState, Stage};
use crate::error::{ProvisionError, ProvisionResult};
use crate::identity::{KeyPair, KeyPairGenerator};
use crate::mnemonic::{MnemonicEncoder, SeedPhrase};
use crate::pow::{Challenge, PowSolver, PowTask, ProofOfWorkResult};
use crate::registration::{RegisteredAccount, Registrar};

/// Shown whenever registration was given up
pub const LOCAL_ONLY_NOTICE: &str =
    "This identity is usable only locally and is not registered with the service.";

/// Outcome of the submission step so far
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegistrationStatus {
    /// No submission attempted yet
    #[default]
    NotSubmitted,
    /// Last attempt failed; the draft is kept for a retry
    Failed { attempts: u32, last_error: String },
    /// The user stopped retrying
    LocalOnly { attempts: u32, last_error: Option<String> },
    /// Service accepted the account on attempt number `attempts`
    Registered {
        attempts: u32,
        account: RegisteredAccount,
    },
}

impl RegistrationStatus {
    /// Submissions made so far, failed ones included
    pub fn attempts(&self) -> u32 {
        match self {
            RegistrationStatus::Failed { attempts, .. }
            | RegistrationStatus::LocalOnly { attempts, .. }
            | RegistrationStatus::Registered { attempts, .. } => *attempts,
            RegistrationStatus::NotSubmitted => 0,
        }
    }
}

/// Sequences key generation, backup, proof-of-work, profile, and submission.
pub struct ProvisioningOrchestrator<R: Registrar> {
    state: ProvisionState,
    keygen: KeyPairGenerator,
    encoder: MnemonicEncoder,
    solver: PowSolver,
    registrar: R,
    registration: RegistrationStatus,
    /// Solver runs started for the current identity
    pow_attempts: u32,
}

impl<R: Registrar> ProvisioningOrchestrator<R> {
    /// Orchestrator using OS entropy and the embedded word list
    pub fn new(registrar: R, solver: PowSolver) -> ProvisionResult<Self> {
        Ok(Self::with_parts(
            KeyPairGenerator::default(),
            MnemonicEncoder::embedded()?,
            solver,
            registrar,
        ))
    }

    /// Orchestrator with explicit components
    pub fn with_parts(
        keygen: KeyPairGenerator,
        encoder: MnemonicEncoder,
        solver: PowSolver,
        registrar: R,
    ) -> Self {
        Self {
            state: ProvisionState::new(),
            keygen,
            encoder,
            solver,
            registrar,
            registration: RegistrationStatus::NotSubmitted,
            pow_attempts: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn state(&self) -> &ProvisionState {
        &self.state
    }

    pub fn keypair(&self) -> Option<&KeyPair> {
        self.state.artifacts.keypair.as_ref()
    }

    pub fn seed_phrase(&self) -> Option<&SeedPhrase> {
        self.state.artifacts.seed_phrase.as_ref()
    }

    pub fn proof_of_work(&self) -> Option<&ProofOfWorkResult> {
        self.state.artifacts.proof_of_work.as_ref()
    }

    pub fn profile(&self) -> Option<&ProfileConfig> {
        self.state.artifacts.profile.as_ref()
    }

    pub fn draft(&self) -> Option<&AccountDraft> {
        self.state.artifacts.draft.as_ref()
    }

    pub fn account(&self) -> Option<&RegisteredAccount> {
        self.state.artifacts.account.as_ref()
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    pub fn solver(&self) -> &PowSolver {
        &self.solver
    }

    pub fn registration_status(&self) -> &RegistrationStatus {
        &self.registration
    }

    /// Number of solver runs started for the current identity
    pub fn pow_attempts(&self) -> u32 {
        self.pow_attempts
    }

    /// Notice to show once registration has been abandoned
    pub fn local_only_notice(&self) -> Option<&'static str> {
        match self.registration {
            RegistrationStatus::LocalOnly { .. } => Some(LOCAL_ONLY_NOTICE),
            _ => None,
        }
    }

    fn apply(&mut self, event: ProvisionEvent) -> ProvisionResult<()> {
        let from = self.state.stage;
        self.state = self.state.apply(event)?;
        debug!(%from, to = %self.state.stage, "Stage transition");
        Ok(())
    }

    /// Generate the keypair and seed phrase.
    ///
    /// If an identity already exists (the user went back to `Welcome`), it is
    /// returned unchanged and the orchestrator moves forward again.
    pub fn generate_identity(&mut self) -> ProvisionResult<KeyPair> {
        if let Some(existing) = self.state.artifacts.keypair.clone() {
            if self.state.stage == Stage::Welcome {
                self.apply(ProvisionEvent::Advance)?;
            }
            return Ok(existing);
        }

        let keypair = self.keygen.generate()?;
        let seed_phrase = self.encoder.generate()?;
        self.apply(ProvisionEvent::IdentityGenerated {
            keypair: keypair.clone(),
            seed_phrase,
        })?;
        info!(public_id = %keypair.public_id(), "Identity generated");
        Ok(keypair)
    }

    /// Record that the user has saved their secret and phrase.
    ///
    /// When `typed_phrase` is given it must match the generated phrase.
    pub fn confirm_backup(&mut self, typed_phrase: Option<&str>) -> ProvisionResult<()> {
        if let Some(typed) = typed_phrase {
            let phrase = self
                .state
                .artifacts
                .seed_phrase
                .as_ref()
                .ok_or(ProvisionError::MissingArtifact("seed phrase"))?;
            phrase.confirm(typed)?;
        }
        self.apply(ProvisionEvent::BackupConfirmed)
    }

    /// Start the solver on a worker thread with a fresh challenge.
    ///
    /// The caller observes or cancels the returned task and hands its outcome
    /// to [`finish_pow`](Self::finish_pow).
    pub fn start_pow(&mut self) -> ProvisionResult<PowTask> {
        let public_id = self
            .keypair()
            .map(KeyPair::public_id)
            .ok_or(ProvisionError::MissingArtifact("keypair"))?;
        let challenge = Challenge::new(public_id);
        self.apply(ProvisionEvent::PowStarted(challenge.clone()))?;
        self.pow_attempts += 1;
        info!(attempt = self.pow_attempts, "Proof-of-work attempt started");
        Ok(self.solver.spawn(challenge))
    }

    /// Record the outcome of a solver run started by [`start_pow`](Self::start_pow).
    ///
    /// On failure the orchestrator returns to `BackedUp` so a new attempt
    /// (with a new challenge) can be started.
    pub fn finish_pow(
        &mut self,
        outcome: ProvisionResult<ProofOfWorkResult>,
    ) -> ProvisionResult<ProofOfWorkResult> {
        match outcome {
            Ok(result) => {
                self.apply(ProvisionEvent::PowSolved(result.clone()))?;
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Proof-of-work attempt failed");
                self.apply(ProvisionEvent::PowFailed)?;
                Err(e)
            }
        }
    }

    /// Solve the proof-of-work, or return the stored result if one exists.
    pub async fn solve_pow(&mut self) -> ProvisionResult<ProofOfWorkResult> {
        if let Some(existing) = self.state.artifacts.proof_of_work.clone() {
            if self.state.stage == Stage::BackedUp {
                self.apply(ProvisionEvent::Advance)?;
            }
            debug!(nonce = existing.nonce, "Reusing stored proof-of-work");
            return Ok(existing);
        }
        let task = self.start_pow()?;
        let outcome = task.join().await;
        self.finish_pow(outcome)
    }

    /// Pick profile settings and sign the account draft.
    pub fn choose_profile(&mut self, profile: ProfileConfig) -> ProvisionResult<&AccountDraft> {
        self.apply(ProvisionEvent::ProfileChosen(profile))?;
        self.draft()
            .ok_or(ProvisionError::MissingArtifact("account draft"))
    }

    /// Send the stored draft to the registrar.
    ///
    /// On failure the stage stays `ProfileChosen` and the draft, including
    /// its proof-of-work, is kept for [`submit`](Self::submit) to be called
    /// again.
    pub async fn submit(&mut self) -> ProvisionResult<RegisteredAccount> {
        if self.state.stage != Stage::ProfileChosen {
            return Err(ProvisionError::InvalidTransition {
                stage: self.state.stage,
                event: "submit",
            });
        }
        let request = self
            .draft()
            .ok_or(ProvisionError::MissingArtifact("account draft"))?
            .to_request();
        let attempts = self.registration.attempts() + 1;

        match self.registrar.register(&request).await {
            Ok(account) => {
                self.apply(ProvisionEvent::Registered(account.clone()))?;
                self.registration = RegistrationStatus::Registered {
                    attempts,
                    account: account.clone(),
                };
                info!(user_id = %account.user_id, attempts, "Registration complete");
                Ok(account)
            }
            Err(e) => {
                warn!(attempts, error = %e, "Registration failed; draft kept for retry");
                self.registration = RegistrationStatus::Failed {
                    attempts,
                    last_error: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Stop trying to register. The identity stays usable locally.
    pub fn abandon_registration(&mut self) -> ProvisionResult<&'static str> {
        let (attempts, last_error) = match &self.registration {
            RegistrationStatus::Registered { .. } => {
                return Err(ProvisionError::InvalidTransition {
                    stage: self.state.stage,
                    event: "abandon registration",
                })
            }
            RegistrationStatus::Failed {
                attempts,
                last_error,
            } => (*attempts, Some(last_error.clone())),
            RegistrationStatus::LocalOnly {
                attempts,
                last_error,
            } => (*attempts, last_error.clone()),
            RegistrationStatus::NotSubmitted => (0, None),
        };
        if self.keypair().is_none() {
            return Err(ProvisionError::MissingArtifact("keypair"));
        }
        self.registration = RegistrationStatus::LocalOnly {
            attempts,
            last_error,
        };
        info!(attempts, "Registration abandoned; identity is local only");
        Ok(LOCAL_ONLY_NOTICE)
    }

    /// Revisit an earlier stage without discarding anything.
    pub fn go_back(&mut self, stage: Stage) -> ProvisionResult<()> {
        self.apply(ProvisionEvent::GoBack(stage))
    }

    /// Move forward into the next stage whose artifact already exists.
    pub fn advance(&mut self) -> ProvisionResult<()> {
        self.apply(ProvisionEvent::Advance)
    }

    /// Discard the proof-of-work and the draft built on it.
    pub fn restart_pow(&mut self) -> ProvisionResult<()> {
        self.apply(ProvisionEvent::RestartPow)?;
        if !matches!(self.registration, RegistrationStatus::Registered { .. }) {
            self.registration = RegistrationStatus::NotSubmitted;
        }
        Ok(())
    }

    /// Discard everything and return to `Welcome`.
    pub fn restart(&mut self) -> ProvisionResult<()> {
        self.apply(ProvisionEvent::Restart)?;
        self.registration = RegistrationStatus::NotSubmitted;
        self.pow_attempts = 0;
        info!("Provisioning restarted");
        Ok(())
    }
}
