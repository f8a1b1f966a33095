//! Profile configuration and the signed account draft

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, ProvisionResult};
use crate::identity::KeyPair;
use crate::mnemonic::SeedPhrase;
use crate::pow::ProofOfWorkResult;
use crate::registration::RegistrationRequest;

/// Who can see the account's profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    /// Listed and visible to everyone
    Public,
    /// Visible, but with no linkable profile details
    #[default]
    Anonymous,
    /// Hidden from listings
    Private,
}

impl std::fmt::Display for ProfileVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProfileVisibility::Public => "public",
            ProfileVisibility::Anonymous => "anonymous",
            ProfileVisibility::Private => "private",
        };
        f.write_str(name)
    }
}

impl FromStr for ProfileVisibility {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(ProfileVisibility::Public),
            "anonymous" => Ok(ProfileVisibility::Anonymous),
            "private" => Ok(ProfileVisibility::Private),
            other => Err(ProvisionError::Config(format!(
                "unknown profile visibility '{other}' (public, anonymous, private)"
            ))),
        }
    }
}

/// Conversational tone of the account's agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTone {
    #[default]
    Neutral,
    Friendly,
    Formal,
    Concise,
    Playful,
}

impl std::fmt::Display for AgentTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentTone::Neutral => "neutral",
            AgentTone::Friendly => "friendly",
            AgentTone::Formal => "formal",
            AgentTone::Concise => "concise",
            AgentTone::Playful => "playful",
        };
        f.write_str(name)
    }
}

impl FromStr for AgentTone {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "neutral" => Ok(AgentTone::Neutral),
            "friendly" => Ok(AgentTone::Friendly),
            "formal" => Ok(AgentTone::Formal),
            "concise" => Ok(AgentTone::Concise),
            "playful" => Ok(AgentTone::Playful),
            other => Err(ProvisionError::Config(format!("unknown agent tone '{other}'"))),
        }
    }
}

/// Agent behavior settings chosen at sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub tone: AgentTone,
    /// 1 (terse) to 5 (elaborate)
    pub verbosity: u8,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tone: AgentTone::default(),
            verbosity: 3,
        }
    }
}

/// User-chosen profile settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    pub visibility: ProfileVisibility,
    pub agent: AgentConfig,
}

impl ProfileConfig {
    pub fn new(visibility: ProfileVisibility, tone: AgentTone, verbosity: u8) -> Self {
        Self {
            visibility,
            agent: AgentConfig { tone, verbosity },
        }
    }

    /// Reject out-of-range settings
    pub fn validate(&self) -> ProvisionResult<()> {
        if !(1..=5).contains(&self.agent.verbosity) {
            return Err(ProvisionError::Config(format!(
                "agent verbosity {} is outside 1..=5",
                self.agent.verbosity
            )));
        }
        Ok(())
    }
}

/// Everything the registration endpoint needs, signed by the account key.
///
/// Built once on entering `ProfileChosen` and never changed afterwards;
/// retries resend the same draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDraft {
    public_id: String,
    public_key: String,
    signing_key: String,
    seed_phrase: SeedPhrase,
    proof_of_work: ProofOfWorkResult,
    profile: ProfileConfig,
    signature: String,
}

impl AccountDraft {
    /// Assemble and sign a draft.
    pub fn sign(
        keypair: &KeyPair,
        seed_phrase: &SeedPhrase,
        proof_of_work: &ProofOfWorkResult,
        profile: &ProfileConfig,
    ) -> ProvisionResult<Self> {
        let mut draft = Self {
            public_id: keypair.public_id(),
            public_key: keypair.public_key_hex(),
            signing_key: keypair.signing_key_hex(),
            seed_phrase: seed_phrase.clone(),
            proof_of_work: proof_of_work.clone(),
            profile: profile.clone(),
            signature: String::new(),
        };
        let payload = draft.to_request().signing_payload()?;
        draft.signature = hex::encode(keypair.sign(&payload).to_bytes());
        Ok(draft)
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// Full RSA SPKI, hex-encoded
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn seed_phrase(&self) -> &SeedPhrase {
        &self.seed_phrase
    }

    pub fn proof_of_work(&self) -> &ProofOfWorkResult {
        &self.proof_of_work
    }

    pub fn profile(&self) -> &ProfileConfig {
        &self.profile
    }

    /// Hex-encoded Ed25519 signature over the canonical payload
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Check the key binding and the signature
    pub fn verify_signature(&self) -> ProvisionResult<()> {
        self.to_request().verify_signature()
    }

    /// Wire body for the registration endpoint
    pub fn to_request(&self) -> RegistrationRequest {
        RegistrationRequest {
            public_id: self.public_id.clone(),
            public_key: self.public_key.clone(),
            signing_key: self.signing_key.clone(),
            seed_phrase: self.seed_phrase.clone(),
            proof_of_work: self.proof_of_work.clone(),
            profile_type: self.profile.visibility,
            agent_config: self.profile.agent.clone(),
            signature: self.signature.clone(),
        }
    }
}
