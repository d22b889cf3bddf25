//! Transactions and the legacy wire format.
//!
//! Transactions are assembled from plain instructions and compiled by hand,
//! without `solana-sdk`. The wire format is:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use ed25519_dalek::{Signer, SigningKey};

use crate::address::Address;
use crate::error::SolError;

/// The System Program: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

/// Account indices are single bytes on the wire.
const MAX_ACCOUNT_KEYS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program invocation: which program, which accounts (in order), and an
/// opaque data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    /// Account addresses in the order the program will see them.
    pub fn account_addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|m| m.address).collect()
    }
}

/// An unsigned transaction: an ordered instruction list plus the fee payer.
///
/// Signatures and the recent blockhash are attached only when the
/// transaction is compiled for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    fee_payer: Address,
    instructions: Vec<Instruction>,
}

impl Transaction {
    pub fn new(fee_payer: Address, instructions: Vec<Instruction>) -> Self {
        Self {
            fee_payer,
            instructions,
        }
    }

    pub fn fee_payer(&self) -> &Address {
        &self.fee_payer
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Compile into a message bound to `recent_blockhash`.
    pub fn compile(&self, recent_blockhash: &[u8; 32]) -> Result<Message, SolError> {
        compile_message(&self.instructions, &self.fee_payer, recent_blockhash)
    }

    /// Compile, sign with every required signer and serialize to wire bytes.
    ///
    /// `signers` must cover every signing account the message requires; extra
    /// keys are ignored. The resulting bytes are ready for `sendTransaction`.
    pub fn sign(
        &self,
        recent_blockhash: &[u8; 32],
        signers: &[&SigningKey],
    ) -> Result<Vec<u8>, SolError> {
        let message = self.compile(recent_blockhash)?;
        let message_bytes = message.serialize()?;

        let required = message.signer_keys();
        let mut wire = Vec::with_capacity(3 + 64 * required.len() + message_bytes.len());
        wire.extend_from_slice(&compact_len(required.len(), "signatures")?);

        for key in required {
            let signer = signers
                .iter()
                .find(|s| s.verifying_key().as_bytes() == key.as_bytes())
                .ok_or_else(|| SolError::SigningError(format!("missing signer for {key}")))?;
            wire.extend_from_slice(&signer.sign(&message_bytes).to_bytes());
        }

        wire.extend_from_slice(&message_bytes);
        Ok(wire)
    }
}

/// A compiled message: account references replaced by u8 indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// All account keys referenced by this message, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction whose accounts are indices into `Message::account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

impl Message {
    pub fn signer_keys(&self) -> &[Address] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&compact_len(
            self.compiled_instructions.len(),
            "instructions",
        )?);
        for ix in &self.compiled_instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

/// Compile instructions with a single fee payer into a message.
///
/// The fee payer is always a writable signer at index 0. Accounts that
/// appear in several instructions are merged, keeping the union of their
/// permission bits.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &Address,
    recent_blockhash: &[u8; 32],
) -> Result<Message, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "transaction has no instructions".into(),
        ));
    }

    // Instruction account lists are tiny, a Vec beats a map here.
    let mut entries: Vec<AccountMeta> = Vec::new();

    let mut upsert = |address: Address, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountMeta {
                address,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.address, meta.is_signer, meta.is_writable);
        }
        // Program IDs are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(SolError::TransactionBuildError(format!(
            "{} account keys exceed the {MAX_ACCOUNT_KEYS} key limit",
            entries.len()
        )));
    }

    // Stable sort: within a category insertion order is kept, so the fee
    // payer (inserted first as a writable signer) stays at index 0.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    // Header counts are single bytes; 256 keys of one kind cannot be encoded.
    let count = |pred: fn(&AccountMeta) -> bool| -> Result<u8, SolError> {
        let n = entries.iter().filter(|e| pred(e)).count();
        u8::try_from(n).map_err(|_| {
            SolError::TransactionBuildError(format!("{n} accounts overflow a message header count"))
        })
    };
    let num_required_signatures = count(|e| e.is_signer)?;
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable)?;
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable)?;

    let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();
    let index_of = |address: &Address| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == address)
            .map(|i| i as u8)
            .ok_or_else(|| {
                SolError::TransactionBuildError(format!("{address} not in account keys"))
            })
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.address))
            .collect::<Result<Vec<u8>, SolError>>()?;

        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Message {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

// ---------------------------------------------------------------------------
// System Program
// ---------------------------------------------------------------------------

/// Build a System Program `Transfer` instruction moving `lamports` from
/// `from` (signer) to `to`.
pub fn system_transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
    // u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}
