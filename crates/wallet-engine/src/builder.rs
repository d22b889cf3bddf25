//! Pure transaction construction.
//!
//! Builders only assemble; they never submit. Each returns an unsigned
//! [`Transaction`] whose fee payer is the account that must sign, except
//! [`build_mint_call`], which yields a remote-call descriptor because minting
//! is delegated to a program-specific RPC method.

use serde::Serialize;

use chain_sol::{
    create_associated_token_account_idempotent, system_transfer, transfer_checked, Address,
    Transaction,
};

use crate::error::WalletError;
use crate::rpc::RpcRequest;

/// RPC method used for candy-machine mints.
pub const MINT_METHOD: &str = "mintV2";

/// Single System Program transfer from `from` to `to`.
pub fn build_native_transfer(
    from: &Address,
    to: &Address,
    lamports: u64,
) -> Result<Transaction, WalletError> {
    require_positive(lamports)?;
    Ok(Transaction::new(
        *from,
        vec![system_transfer(from, to, lamports)],
    ))
}

/// Single SPL `TransferChecked` between two token accounts.
///
/// `decimals` must equal the mint's declared decimals; it is not looked up.
/// `owner` signs and pays the fee.
pub fn build_token_transfer(
    token_program: &Address,
    from_token_account: &Address,
    to_token_account: &Address,
    amount: u64,
    decimals: u8,
    owner: &Address,
    mint: &Address,
) -> Result<Transaction, WalletError> {
    require_positive(amount)?;
    let ix = transfer_checked(
        token_program,
        from_token_account,
        mint,
        to_token_account,
        owner,
        amount,
        decimals,
    );
    Ok(Transaction::new(*owner, vec![ix]))
}

/// Single create-if-absent instruction for the `(owner, mint)` associated
/// token account, paid by `payer`. Safe to submit even if it already exists.
pub fn build_idempotent_account_creation(
    token_program: &Address,
    payer: &Address,
    owner: &Address,
    mint: &Address,
) -> Result<Transaction, WalletError> {
    let ix = create_associated_token_account_idempotent(payer, owner, mint, token_program)?;
    Ok(Transaction::new(*payer, vec![ix]))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintParams {
    collection_mint: String,
    candy_machine: String,
    candy_guard: String,
    nft_mint: String,
    collection_update_authority: String,
    mint_args: MintArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintArgs {
    sol_payment: SolPayment,
}

#[derive(Serialize)]
struct SolPayment {
    destination: String,
}

/// Describe a `mintV2` call. The payer is both the collection update
/// authority and the SOL payment destination.
pub fn build_mint_call(
    payer: &Address,
    nft_mint: &Address,
    collection: &Address,
    candy_machine: &Address,
    candy_guard: &Address,
) -> Result<RpcRequest, WalletError> {
    let params = MintParams {
        collection_mint: collection.to_string(),
        candy_machine: candy_machine.to_string(),
        candy_guard: candy_guard.to_string(),
        nft_mint: nft_mint.to_string(),
        collection_update_authority: payer.to_string(),
        mint_args: MintArgs {
            sol_payment: SolPayment {
                destination: payer.to_string(),
            },
        },
    };

    let value = serde_json::to_value(params)
        .map_err(|e| WalletError::TransactionFailed(format!("mint params: {e}")))?;
    Ok(RpcRequest::new(MINT_METHOD, vec![value]))
}

fn require_positive(amount: u64) -> Result<(), WalletError> {
    if amount == 0 {
        return Err(WalletError::InvalidAmount("amount must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_sol::{
        derive_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID,
        TOKEN_PROGRAM_ID,
    };
    use serde_json::json;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn native_transfer_is_one_instruction_sender_then_recipient() {
        let tx = build_native_transfer(&addr(1), &addr(2), 5_000).unwrap();
        assert_eq!(tx.fee_payer(), &addr(1));
        assert_eq!(tx.instructions().len(), 1);

        let ix = &tx.instructions()[0];
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.account_addresses(), vec![addr(1), addr(2)]);
    }

    #[test]
    fn zero_amounts_rejected() {
        assert!(matches!(
            build_native_transfer(&addr(1), &addr(2), 0),
            Err(WalletError::InvalidAmount(_))
        ));
        assert!(matches!(
            build_token_transfer(&TOKEN_PROGRAM_ID, &addr(1), &addr(2), 0, 6, &addr(3), &addr(4)),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn token_transfer_carries_decimals_and_owner_pays() {
        let tx = build_token_transfer(
            &TOKEN_PROGRAM_ID,
            &addr(1),
            &addr(2),
            1_000_000,
            6,
            &addr(3),
            &addr(4),
        )
        .unwrap();

        assert_eq!(tx.fee_payer(), &addr(3));
        let ix = &tx.instructions()[0];
        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data[0], 12);
        assert_eq!(ix.data[9], 6);
        assert_eq!(ix.account_addresses(), vec![addr(1), addr(4), addr(2), addr(3)]);
    }

    #[test]
    fn idempotent_creation_targets_derived_ata() {
        let tx =
            build_idempotent_account_creation(&TOKEN_PROGRAM_ID, &addr(9), &addr(3), &addr(4))
                .unwrap();
        let (ata, _) = derive_associated_token_address(&addr(3), &addr(4), &TOKEN_PROGRAM_ID)
            .unwrap();

        assert_eq!(tx.fee_payer(), &addr(9));
        assert_eq!(tx.instructions().len(), 1);
        let ix = &tx.instructions()[0];
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.accounts[1].address, ata);
    }

    #[test]
    fn mint_call_descriptor() {
        let payer = addr(1);
        let req = build_mint_call(&payer, &addr(2), &addr(3), &addr(4), &addr(5)).unwrap();

        assert_eq!(req.method, "mintV2");
        assert_eq!(req.params.len(), 1);
        assert_eq!(
            req.params[0],
            json!({
                "collectionMint": addr(3).to_string(),
                "candyMachine": addr(4).to_string(),
                "candyGuard": addr(5).to_string(),
                "nftMint": addr(2).to_string(),
                "collectionUpdateAuthority": payer.to_string(),
                "mintArgs": { "solPayment": { "destination": payer.to_string() } },
            })
        );
    }

    #[test]
    fn mint_call_keeps_parameter_order() {
        let req = build_mint_call(&addr(1), &addr(2), &addr(3), &addr(4), &addr(5)).unwrap();
        let keys: Vec<&str> = req.params[0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec![
                "collectionMint",
                "candyMachine",
                "candyGuard",
                "nftMint",
                "collectionUpdateAuthority",
                "mintArgs",
            ]
        );
    }
}
