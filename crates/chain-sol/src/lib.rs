//! Solana chain primitives for the wallet engine.
//!
//! This crate handles addresses, program-derived address search, the
//! legacy transaction wire format and the handful of System / SPL Token /
//! Associated Token Account instructions the wallet needs. It does no I/O
//! and does not depend on `solana-sdk`; Ed25519 comes from `ed25519-dalek`,
//! curve checks from `curve25519-dalek` and Base58 from `bs58`.

pub mod address;
pub mod error;
pub mod pda;
pub mod spl_token;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{validate_address, Address};
pub use error::SolError;
pub use pda::{create_program_address, find_program_address};
pub use spl_token::{
    create_associated_token_account_idempotent, derive_associated_token_address,
    transfer_checked, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    compile_message, decode_compact_u16, encode_compact_u16, system_transfer, AccountMeta,
    CompiledInstruction, Instruction, Message, Transaction, SYSTEM_PROGRAM_ID,
};
