//! Registration endpoint boundary
//!
//! The core hands a signed [`AccountDraft`](crate::provision::AccountDraft)
//! to a [`Registrar`]. Two are provided:
//!
//! - [`HttpRegistrar`] posts JSON to a remote service.
//! - [`MemoryRegistrar`] is an in-process stand-in that re-verifies the
//!   proof-of-work and signature the way a real service must.

mod http;
mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, ProvisionResult};
use crate::mnemonic::SeedPhrase;
use crate::pow::ProofOfWorkResult;
use crate::identity::{check_public_id, verify_with_signing_key};
use crate::provision::{AgentConfig, ProfileVisibility};

pub use http::HttpRegistrar;
pub use memory::MemoryRegistrar;

/// Body posted to the registration endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub public_id: String,
    /// Full RSA SPKI, hex; `public_id` is its display tail
    pub public_key: String,
    /// Ed25519 verifying key, hex
    pub signing_key: String,
    pub seed_phrase: SeedPhrase,
    pub proof_of_work: ProofOfWorkResult,
    pub profile_type: ProfileVisibility,
    pub agent_config: AgentConfig,
    /// Hex Ed25519 signature over the other fields
    pub signature: String,
}

/// Fields covered by the draft signature, in signing order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningView<'a> {
    public_id: &'a str,
    public_key: &'a str,
    signing_key: &'a str,
    seed_phrase: &'a SeedPhrase,
    proof_of_work: &'a ProofOfWorkResult,
    profile_type: ProfileVisibility,
    agent_config: &'a AgentConfig,
}

impl RegistrationRequest {
    /// Canonical bytes the signature covers
    pub fn signing_payload(&self) -> ProvisionResult<Vec<u8>> {
        let view = SigningView {
            public_id: &self.public_id,
            public_key: &self.public_key,
            signing_key: &self.signing_key,
            seed_phrase: &self.seed_phrase,
            proof_of_work: &self.proof_of_work,
            profile_type: self.profile_type,
            agent_config: &self.agent_config,
        };
        Ok(serde_json::to_vec(&view)?)
    }

    /// Check that the public id names the RSA key and that the signature
    /// covers this exact request
    pub fn verify_signature(&self) -> ProvisionResult<()> {
        check_public_id(&self.public_id, &self.public_key)?;
        let payload = self.signing_payload()?;
        verify_with_signing_key(&self.signing_key, &payload, &self.signature)
    }
}

/// Identifiers assigned by the service to a new account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAccount {
    pub user_id: String,
    pub public_key_hash: String,
    pub account_status: String,
    pub ledger_block_id: String,
}

/// Service reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<RegisteredAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationResponse {
    /// Successful reply carrying `account`
    pub fn accepted(account: RegisteredAccount) -> Self {
        Self {
            success: true,
            user: Some(account),
            error: None,
        }
    }

    /// Refusal with a reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            error: Some(reason.into()),
        }
    }

    /// Collapse into the account or a `RegistrationRejected` error
    pub fn into_result(self) -> ProvisionResult<RegisteredAccount> {
        match (self.success, self.user) {
            (true, Some(account)) => Ok(account),
            (true, None) => Err(ProvisionError::RegistrationRejected(
                "service reported success without an account".into(),
            )),
            (false, _) => Err(ProvisionError::RegistrationRejected(
                self.error.unwrap_or_else(|| "no reason given".into()),
            )),
        }
    }
}

/// Something that can register an account draft.
pub trait Registrar: Send + Sync {
    /// Submit one request. `Network` errors mean the outcome is unknown and
    /// the same request may be sent again.
    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = ProvisionResult<RegisteredAccount>> + Send;
}
