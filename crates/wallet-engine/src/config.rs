use serde::{Deserialize, Serialize};

use chain_sol::{Address, TOKEN_PROGRAM_ID};

use crate::error::WalletError;
use crate::keys::DerivationScheme;

/// Default endpoint handed to transports that do not override it.
pub const DEFAULT_RPC_ENDPOINT: &str = "https://api.devnet.solana.com";

/// Commitment level requested from the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// What to do when a balance read fails at the transport level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailurePolicy {
    /// Return `WalletError::QueryFailure` to the caller.
    #[default]
    Propagate,
    /// Log a warning and report a zero balance. Masks real outages.
    DegradeToZero,
}

/// Engine configuration. Every field has a default, so an empty JSON object
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rpc_endpoint: String,
    pub commitment: Commitment,
    pub derivation: DerivationScheme,
    pub token_program: Address,
    pub query_failure: QueryFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            commitment: Commitment::default(),
            derivation: DerivationScheme::default(),
            token_program: TOKEN_PROGRAM_ID,
            query_failure: QueryFailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, WalletError> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| WalletError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.rpc_endpoint.trim().is_empty() {
            return Err(WalletError::InvalidConfig("rpc_endpoint is empty".into()));
        }
        Ok(())
    }

    pub fn with_query_failure(mut self, policy: QueryFailurePolicy) -> Self {
        self.query_failure = policy;
        self
    }

    pub fn with_derivation(mut self, scheme: DerivationScheme) -> Self {
        self.derivation = scheme;
        self
    }

    pub fn with_token_program(mut self, program: Address) -> Self {
        self.token_program = program;
        self
    }
}
