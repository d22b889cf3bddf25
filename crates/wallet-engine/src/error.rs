use thiserror::Error;

use crate::rpc::RpcError;

/// Errors surfaced by the wallet engine.
///
/// Validation failures (`InvalidAmount`, `InsufficientBalance`) are always
/// raised before anything is submitted. Transport failures keep their
/// original [`RpcError`] as the source.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address resolution failed: {0}")]
    AddressResolutionFailure(String),

    #[error("Submission failed ({context}): {source}")]
    SubmissionFailure {
        context: String,
        #[source]
        source: RpcError,
    },

    #[error("Query failed ({context}): {source}")]
    QueryFailure {
        context: String,
        #[source]
        source: RpcError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transaction build failed: {0}")]
    TransactionFailed(String),
}

impl WalletError {
    pub(crate) fn query(context: impl Into<String>, source: RpcError) -> Self {
        WalletError::QueryFailure {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn submission(context: impl Into<String>, source: RpcError) -> Self {
        WalletError::SubmissionFailure {
            context: context.into(),
            source,
        }
    }

    /// Whether the error was raised by input validation, before any
    /// transaction was assembled or submitted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WalletError::InvalidAmount(_)
                | WalletError::InsufficientBalance { .. }
                | WalletError::InvalidAddress(_)
                | WalletError::InvalidMnemonic(_)
        )
    }
}

impl From<chain_sol::SolError> for WalletError {
    fn from(e: chain_sol::SolError) -> Self {
        use chain_sol::SolError;

        match e {
            SolError::InvalidAddress(msg) => WalletError::InvalidAddress(msg),
            SolError::NoValidAddress | SolError::PointOnCurve | SolError::InvalidSeeds(_) => {
                WalletError::AddressResolutionFailure(e.to_string())
            }
            other => WalletError::TransactionFailed(format!("SOL: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn insufficient_balance_display() {
        let err = WalletError::InsufficientBalance {
            requested: 10,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: requested 10, available 3"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn submission_failure_keeps_source() {
        let err = WalletError::submission("sendTransaction", RpcError::Transport("timeout".into()));
        assert!(!err.is_validation());
        let source = err.source().expect("source preserved");
        assert_eq!(source.to_string(), "transport error: timeout");
    }

    #[test]
    fn no_valid_address_maps_to_resolution_failure() {
        let err: WalletError = chain_sol::SolError::NoValidAddress.into();
        assert!(matches!(err, WalletError::AddressResolutionFailure(_)));
    }

    #[test]
    fn invalid_address_maps_through() {
        let err: WalletError = chain_sol::SolError::InvalidAddress("bad".into()).into();
        assert!(matches!(err, WalletError::InvalidAddress(ref m) if m == "bad"));
    }
}
