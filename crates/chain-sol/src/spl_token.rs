//! SPL Token and Associated Token Account instructions.
//!
//! Implements `TransferChecked`, the idempotent ATA creation instruction and
//! ATA address derivation without pulling in the `spl-token` or
//! `spl-associated-token-account` crates.

use crate::address::Address;
use crate::error::SolError;
use crate::pda::find_program_address;
use crate::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Token-2022 Program ID: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd,
    0xda, 0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1,
    0x8b, 0xfc,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// SPL Token `TransferChecked` instruction tag.
const TRANSFER_CHECKED_TAG: u8 = 12;

/// Associated Token Account `CreateIdempotent` instruction tag.
const CREATE_IDEMPOTENT_TAG: u8 = 1;

// ---------------------------------------------------------------------------
// SPL Token TransferChecked
// ---------------------------------------------------------------------------

/// Build an SPL Token `TransferChecked` instruction.
///
/// The token program rejects the transfer unless `decimals` matches the
/// mint's declared decimals, so callers must pass the real value.
///
/// # Wire format
///
/// `[12]` followed by u64 LE amount and the u8 decimals. Total data: 10 bytes.
/// Accounts: source (writable), mint, destination (writable), owner (signer).
pub fn transfer_checked(
    token_program: &Address,
    source: &Address,
    mint: &Address,
    destination: &Address,
    owner: &Address,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED_TAG);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Instruction {
        program_id: *token_program,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    }
}

// ---------------------------------------------------------------------------
// Associated Token Account
// ---------------------------------------------------------------------------

/// Derive the associated token account for an owner + mint pair.
///
/// The ATA is a PDA of the Associated Token Account program with seeds
/// `[owner, token_program, mint]`. Returns the address and its bump.
pub fn derive_associated_token_address(
    owner: &Address,
    mint: &Address,
    token_program: &Address,
) -> Result<(Address, u8), SolError> {
    find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}

/// Build an Associated Token Account `CreateIdempotent` instruction.
///
/// The program creates the ATA only if it does not already exist and
/// succeeds either way, so the instruction is safe to submit redundantly.
pub fn create_associated_token_account_idempotent(
    payer: &Address,
    owner: &Address,
    mint: &Address,
    token_program: &Address,
) -> Result<Instruction, SolError> {
    let (ata, _bump) = derive_associated_token_address(owner, mint, token_program)?;

    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(ata, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(*token_program, false),
        ],
        data: vec![CREATE_IDEMPOTENT_TAG],
    })
}
