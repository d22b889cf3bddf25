//! The RPC collaborator.
//!
//! The engine never talks to the network itself. Everything it needs from a
//! node goes through [`SolanaRpc`], which the host implements over whatever
//! transport it uses, or uses [`crate::memory::InMemoryRpc`]. Timeouts and
//! cancellation belong to that implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use chain_sol::{Address, Transaction};

use crate::keys::KeyPair;

/// Errors reported by an RPC transport.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// On-chain account data as returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Address,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
}

/// A named remote call with ordered positional parameters.
///
/// Used for operations delegated to program-specific RPC methods rather
/// than assembled as raw instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Wrap in a JSON-RPC 2.0 envelope.
    pub fn to_json_rpc(&self, id: u64) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": self.method,
            "params": self.params,
        })
    }
}

/// The node operations the engine depends on.
///
/// All calls are blocking. `get_account_info` returns `Ok(None)` when no
/// account exists at the address; errors are reserved for transport or
/// node failures.
pub trait SolanaRpc {
    /// Native balance in lamports.
    fn get_balance(&self, address: &Address) -> Result<u64, RpcError>;

    fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>, RpcError>;

    /// Raw base-unit balance of a token account.
    fn get_token_account_balance(&self, address: &Address) -> Result<u64, RpcError>;

    /// Attach a recent blockhash, sign with `signer` and submit. Returns the
    /// transaction signature.
    fn send_transaction(&self, transaction: &Transaction, signer: &KeyPair)
        -> Result<String, RpcError>;

    fn call(&self, request: &RpcRequest) -> Result<Value, RpcError>;
}

impl<T: SolanaRpc + ?Sized> SolanaRpc for &T {
    fn get_balance(&self, address: &Address) -> Result<u64, RpcError> {
        (**self).get_balance(address)
    }

    fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>, RpcError> {
        (**self).get_account_info(address)
    }

    fn get_token_account_balance(&self, address: &Address) -> Result<u64, RpcError> {
        (**self).get_token_account_balance(address)
    }

    fn send_transaction(
        &self,
        transaction: &Transaction,
        signer: &KeyPair,
    ) -> Result<String, RpcError> {
        (**self).send_transaction(transaction, signer)
    }

    fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        (**self).call(request)
    }
}

impl<T: SolanaRpc + ?Sized> SolanaRpc for Arc<T> {
    fn get_balance(&self, address: &Address) -> Result<u64, RpcError> {
        (**self).get_balance(address)
    }

    fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>, RpcError> {
        (**self).get_account_info(address)
    }

    fn get_token_account_balance(&self, address: &Address) -> Result<u64, RpcError> {
        (**self).get_token_account_balance(address)
    }

    fn send_transaction(
        &self,
        transaction: &Transaction,
        signer: &KeyPair,
    ) -> Result<String, RpcError> {
        (**self).send_transaction(transaction, signer)
    }

    fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        (**self).call(request)
    }
}
