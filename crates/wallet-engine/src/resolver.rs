//! Associated token account resolution.
//!
//! Guarantees an owner's token account for a mint exists before value is
//! sent to it:
//!
//! ```text
//! NotChecked -> Exists                      (balance read)
//! NotChecked -> Absent -> CreationSubmitted (balance reported as zero)
//! ```
//!
//! The existence check and the creation are not atomic. Two callers can
//! both observe "absent" and both submit; the create-idempotent instruction
//! makes that harmless, so a failed creation submission is logged and not
//! returned as an error. Nothing is cached between calls.

use tracing::{debug, info, warn};

use chain_sol::{derive_associated_token_address, Address};

use crate::builder::build_idempotent_account_creation;
use crate::error::WalletError;
use crate::keys::KeyPair;
use crate::rpc::SolanaRpc;

/// How the account was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The account already existed on-chain.
    Existing,
    /// The account was absent and a creation transaction was accepted.
    Created { signature: String },
    /// The account was absent and the creation submission failed. Another
    /// caller may still have created it.
    CreationFailed { reason: String },
}

/// An owner's associated token account for one mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedAccount {
    pub owner: Address,
    pub mint: Address,
    pub address: Address,
    pub bump: u8,
    /// Base-unit balance; `None` when the account did not exist yet.
    pub balance: Option<u64>,
    pub resolution: Resolution,
}

impl AssociatedAccount {
    /// Balance in base units, zero for an account that was just created.
    pub fn base_unit_balance(&self) -> u64 {
        self.balance.unwrap_or(0)
    }

    pub fn existed(&self) -> bool {
        self.resolution == Resolution::Existing
    }
}

/// Look up the `(owner, mint)` associated token account without creating it.
///
/// Returns `Ok(None)` when no account exists at the derived address. Only
/// reads are issued.
pub fn find_existing<R: SolanaRpc + ?Sized>(
    rpc: &R,
    mint: &Address,
    owner: &Address,
    token_program: &Address,
) -> Result<Option<AssociatedAccount>, WalletError> {
    let (address, bump) = derive_associated_token_address(owner, mint, token_program)?;
    debug!(%owner, %mint, ata = %address, bump, "resolved associated token address");

    let info = rpc
        .get_account_info(&address)
        .map_err(|e| WalletError::query("getAccountInfo", e))?;
    if info.is_none() {
        return Ok(None);
    }

    let balance = rpc
        .get_token_account_balance(&address)
        .map_err(|e| WalletError::query("getTokenAccountBalance", e))?;
    debug!(ata = %address, balance, "associated token account exists");

    Ok(Some(AssociatedAccount {
        owner: *owner,
        mint: *mint,
        address,
        bump,
        balance: Some(balance),
        resolution: Resolution::Existing,
    }))
}

/// Resolve the `(owner, mint)` associated token account, submitting an
/// idempotent creation paid by `payer` when it does not exist.
///
/// Query failures (existence check, balance read) are returned as
/// `QueryFailure`; the caller decides whether to degrade.
pub fn resolve_or_create<R: SolanaRpc + ?Sized>(
    rpc: &R,
    payer: &KeyPair,
    mint: &Address,
    owner: &Address,
    token_program: &Address,
) -> Result<AssociatedAccount, WalletError> {
    if let Some(account) = find_existing(rpc, mint, owner, token_program)? {
        return Ok(account);
    }
    let (address, bump) = derive_associated_token_address(owner, mint, token_program)?;

    let tx = build_idempotent_account_creation(token_program, &payer.address(), owner, mint)?;
    let resolution = match rpc.send_transaction(&tx, payer) {
        Ok(signature) => {
            info!(ata = %address, %owner, %mint, %signature, "submitted associated account creation");
            Resolution::Created { signature }
        }
        Err(e) => {
            warn!(ata = %address, %owner, %mint, error = %e, "associated account creation failed");
            Resolution::CreationFailed {
                reason: e.to_string(),
            }
        }
    };

    Ok(AssociatedAccount {
        owner: *owner,
        mint: *mint,
        address,
        bump,
        balance: None,
        resolution,
    })
}
