//! Solana wallet transaction engine.
//!
//! Turns a mnemonic into a keypair, converts between display and base
//! units, assembles native and SPL token transfers, makes sure associated
//! token accounts exist, and delegates candy-machine mints. All node access
//! goes through the [`SolanaRpc`] trait, which the host supplies.
//!
//! ```text
//! mnemonic -> KeyPair -> (ATA resolution) -> balance check
//!          -> Transaction -> SolanaRpc::send_transaction
//! ```

pub mod amount;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod memory;
pub mod mnemonic;
pub mod resolver;
pub mod rpc;

pub use amount::{lamports_to_sol, sol_to_lamports, to_base_units, to_display_units};
pub use builder::{
    build_idempotent_account_creation, build_mint_call, build_native_transfer,
    build_token_transfer,
};
pub use config::{Commitment, EngineConfig, QueryFailurePolicy};
pub use engine::{MintReceipt, TransferReceipt, WalletEngine};
pub use error::WalletError;
pub use keys::{derive, derive_with, DerivationScheme, KeyPair};
pub use memory::InMemoryRpc;
pub use resolver::{find_existing, resolve_or_create, AssociatedAccount, Resolution};
pub use rpc::{AccountInfo, RpcError, RpcRequest, SolanaRpc};

// Chain primitives callers need alongside the engine.
pub use chain_sol::{Address, Transaction};
