//! Provisioning stages and the pure transition function
//!
//! ```text
//! Welcome -> KeysGenerated -> BackedUp -> PowSolving -> PowComplete -> ProfileChosen -> Submitted
//!                                ^            |
//!                                +-- failed --+
//! ```
//!
//! `ProvisionState::apply` never performs I/O. The orchestrator does the
//! work (key generation, hashing, network) and feeds the outcome in as an
//! event.

use serde::{Deserialize, Serialize};

use super::draft::{AccountDraft, ProfileConfig};
use crate::error::{ProvisionError, ProvisionResult};
use crate::identity::KeyPair;
use crate::mnemonic::SeedPhrase;
use crate::pow::{Challenge, ProofOfWorkResult};
use crate::registration::RegisteredAccount;

/// Where the user is in the provisioning flow
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Welcome,
    KeysGenerated,
    BackedUp,
    PowSolving,
    PowComplete,
    ProfileChosen,
    Submitted,
}

impl Stage {
    /// All stages in flow order
    pub const ALL: [Stage; 7] = [
        Stage::Welcome,
        Stage::KeysGenerated,
        Stage::BackedUp,
        Stage::PowSolving,
        Stage::PowComplete,
        Stage::ProfileChosen,
        Stage::Submitted,
    ];

    /// 1-based position, for "step N of 7" displays
    pub fn step(self) -> usize {
        self as usize + 1
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Welcome => "welcome",
            Stage::KeysGenerated => "keys generated",
            Stage::BackedUp => "backed up",
            Stage::PowSolving => "solving proof-of-work",
            Stage::PowComplete => "proof-of-work complete",
            Stage::ProfileChosen => "profile chosen",
            Stage::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// Everything produced so far. Survives backward navigation.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub keypair: Option<KeyPair>,
    pub seed_phrase: Option<SeedPhrase>,
    pub backed_up: bool,
    pub challenge: Option<Challenge>,
    pub proof_of_work: Option<ProofOfWorkResult>,
    pub profile: Option<ProfileConfig>,
    pub draft: Option<AccountDraft>,
    pub account: Option<RegisteredAccount>,
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum ProvisionEvent {
    /// Fresh keypair and seed phrase were generated
    IdentityGenerated {
        keypair: KeyPair,
        seed_phrase: SeedPhrase,
    },
    /// User confirmed they recorded the secret and phrase
    BackupConfirmed,
    /// Solver started on this challenge
    PowStarted(Challenge),
    /// Solver found a solution
    PowSolved(ProofOfWorkResult),
    /// Solver gave up or was cancelled
    PowFailed,
    /// User picked profile settings; the draft is signed here
    ProfileChosen(ProfileConfig),
    /// Registration service accepted the draft
    Registered(RegisteredAccount),
    /// Revisit an earlier stage, keeping all artifacts
    GoBack(Stage),
    /// Re-enter the next stage whose artifact already exists
    Advance,
    /// Discard the proof-of-work (and the draft built on it)
    RestartPow,
    /// Discard everything and start over
    Restart,
}

impl ProvisionEvent {
    fn name(&self) -> &'static str {
        match self {
            ProvisionEvent::IdentityGenerated { .. } => "generate identity",
            ProvisionEvent::BackupConfirmed => "confirm backup",
            ProvisionEvent::PowStarted(_) => "start proof-of-work",
            ProvisionEvent::PowSolved(_) => "record proof-of-work",
            ProvisionEvent::PowFailed => "abandon proof-of-work",
            ProvisionEvent::ProfileChosen(_) => "choose profile",
            ProvisionEvent::Registered(_) => "record registration",
            ProvisionEvent::GoBack(_) => "go back",
            ProvisionEvent::Advance => "advance",
            ProvisionEvent::RestartPow => "restart proof-of-work",
            ProvisionEvent::Restart => "restart",
        }
    }
}

/// Current stage plus artifacts
#[derive(Debug, Clone, Default)]
pub struct ProvisionState {
    pub stage: Stage,
    pub artifacts: Artifacts,
}

impl ProvisionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the state after `event`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the event is not accepted in the current stage,
    /// `MissingArtifact` if a prerequisite has not been produced.
    pub fn apply(&self, event: ProvisionEvent) -> ProvisionResult<ProvisionState> {
        let mut next = self.clone();
        let reject = || ProvisionError::InvalidTransition {
            stage: self.stage,
            event: event.name(),
        };

        match (&self.stage, &event) {
            (Stage::Welcome, ProvisionEvent::IdentityGenerated { keypair, seed_phrase }) => {
                if self.artifacts.keypair.is_some() {
                    return Err(reject());
                }
                next.artifacts.keypair = Some(keypair.clone());
                next.artifacts.seed_phrase = Some(seed_phrase.clone());
                next.stage = Stage::KeysGenerated;
            }
            (Stage::KeysGenerated, ProvisionEvent::BackupConfirmed) => {
                self.require_identity()?;
                next.artifacts.backed_up = true;
                next.stage = Stage::BackedUp;
            }
            (Stage::BackedUp, ProvisionEvent::PowStarted(challenge)) => {
                let keypair = self.require_identity()?;
                if !self.artifacts.backed_up {
                    return Err(ProvisionError::MissingArtifact("backup confirmation"));
                }
                if self.artifacts.proof_of_work.is_some() {
                    return Err(reject());
                }
                if challenge.public_id != keypair.public_id() {
                    return Err(ProvisionError::InvalidTransition {
                        stage: self.stage,
                        event: "start proof-of-work for another identity",
                    });
                }
                next.artifacts.challenge = Some(challenge.clone());
                next.stage = Stage::PowSolving;
            }
            (Stage::PowSolving, ProvisionEvent::PowSolved(result)) => {
                let challenge = self
                    .artifacts
                    .challenge
                    .as_ref()
                    .ok_or(ProvisionError::MissingArtifact("challenge"))?;
                if result.timestamp != challenge.created_at_ms
                    || !result.verify(&challenge.public_id)
                {
                    return Err(ProvisionError::InvalidTransition {
                        stage: self.stage,
                        event: "record a proof-of-work for another challenge",
                    });
                }
                next.artifacts.proof_of_work = Some(result.clone());
                next.stage = Stage::PowComplete;
            }
            (Stage::PowSolving, ProvisionEvent::PowFailed) => {
                next.artifacts.challenge = None;
                next.stage = Stage::BackedUp;
            }
            (
                Stage::PowComplete | Stage::ProfileChosen,
                ProvisionEvent::ProfileChosen(profile),
            ) => {
                let keypair = self.require_identity()?;
                let seed_phrase = self
                    .artifacts
                    .seed_phrase
                    .as_ref()
                    .ok_or(ProvisionError::MissingArtifact("seed phrase"))?;
                let pow = self
                    .artifacts
                    .proof_of_work
                    .as_ref()
                    .ok_or(ProvisionError::MissingArtifact("proof-of-work"))?;
                profile.validate()?;
                next.artifacts.draft = Some(AccountDraft::sign(keypair, seed_phrase, pow, profile)?);
                next.artifacts.profile = Some(profile.clone());
                next.stage = Stage::ProfileChosen;
            }
            (Stage::ProfileChosen, ProvisionEvent::Registered(account)) => {
                if self.artifacts.draft.is_none() {
                    return Err(ProvisionError::MissingArtifact("account draft"));
                }
                next.artifacts.account = Some(account.clone());
                next.stage = Stage::Submitted;
            }
            // a running solve must end in PowSolved or PowFailed first
            (Stage::PowSolving, ProvisionEvent::GoBack(_) | ProvisionEvent::Restart) => {
                return Err(reject());
            }
            (_, ProvisionEvent::GoBack(target)) => {
                if self.stage == Stage::Submitted
                    || *target >= self.stage
                    || *target == Stage::PowSolving
                {
                    return Err(reject());
                }
                next.stage = *target;
            }
            (_, ProvisionEvent::Advance) => {
                next.stage = self.resumable_next().ok_or_else(reject)?;
            }
            (
                Stage::BackedUp | Stage::PowComplete | Stage::ProfileChosen,
                ProvisionEvent::RestartPow,
            ) => {
                next.artifacts.challenge = None;
                next.artifacts.proof_of_work = None;
                next.artifacts.draft = None;
                next.stage = Stage::BackedUp;
            }
            (_, ProvisionEvent::Restart) => {
                next = ProvisionState::default();
            }
            _ => return Err(reject()),
        }

        Ok(next)
    }

    fn require_identity(&self) -> ProvisionResult<&KeyPair> {
        if self.artifacts.seed_phrase.is_none() {
            return Err(ProvisionError::MissingArtifact("seed phrase"));
        }
        self.artifacts
            .keypair
            .as_ref()
            .ok_or(ProvisionError::MissingArtifact("keypair"))
    }

    /// Next stage that can be re-entered without producing anything new
    fn resumable_next(&self) -> Option<Stage> {
        let a = &self.artifacts;
        match self.stage {
            Stage::Welcome if a.keypair.is_some() => Some(Stage::KeysGenerated),
            Stage::KeysGenerated if a.backed_up => Some(Stage::BackedUp),
            Stage::BackedUp if a.proof_of_work.is_some() => Some(Stage::PowComplete),
            Stage::PowComplete if a.draft.is_some() => Some(Stage::ProfileChosen),
            _ => None,
        }
    }

    /// Whether `Advance` would succeed
    pub fn can_advance(&self) -> bool {
        self.resumable_next().is_some()
    }
}
