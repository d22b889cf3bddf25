//! The wallet facade.
//!
//! [`WalletEngine`] composes key derivation, amount conversion, the
//! transaction builders and the associated account resolver over an injected
//! [`SolanaRpc`] client. Every public call is a bounded, blocking sequence
//! of reads followed by at most one submission per transaction.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, warn};

use chain_sol::{Address, Transaction};

use crate::amount::{lamports_to_sol, sol_to_lamports, to_base_units, to_display_units};
use crate::builder::{build_mint_call, build_native_transfer, build_token_transfer, MINT_METHOD};
use crate::config::{EngineConfig, QueryFailurePolicy};
use crate::error::WalletError;
use crate::keys::{derive_with, KeyPair};
use crate::resolver::{find_existing, resolve_or_create, AssociatedAccount};
use crate::rpc::SolanaRpc;

/// Result of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// The transaction as assembled, before blockhash and signatures.
    pub transaction: Transaction,
    pub signature: String,
}

/// Result of a delegated mint.
#[derive(Debug, Clone, PartialEq)]
pub struct MintReceipt {
    /// Freshly generated mint address for the new NFT.
    pub nft_mint: Address,
    /// Raw response of the mint call.
    pub response: Value,
}

pub struct WalletEngine<R> {
    rpc: R,
    config: EngineConfig,
}

impl<R: SolanaRpc> WalletEngine<R> {
    pub fn new(rpc: R, config: EngineConfig) -> Result<Self, WalletError> {
        config.validate()?;
        debug!(
            endpoint = %config.rpc_endpoint,
            commitment = config.commitment.as_str(),
            token_program = %config.token_program,
            "wallet engine configured"
        );
        Ok(Self { rpc, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Derive the account keypair for a mnemonic using the configured scheme.
    pub fn derive_keypair(&self, mnemonic: &str, passphrase: &str) -> Result<KeyPair, WalletError> {
        derive_with(mnemonic, passphrase, self.config.derivation)
    }

    /// Native balance in lamports.
    pub fn sol_balance_lamports(&self, address: &Address) -> Result<u64, WalletError> {
        let read = self
            .rpc
            .get_balance(address)
            .map_err(|e| WalletError::query("getBalance", e));
        self.apply_query_policy(read)
    }

    /// Native balance in SOL.
    pub fn sol_balance(&self, address: &Address) -> Result<Decimal, WalletError> {
        self.sol_balance_lamports(address).map(lamports_to_sol)
    }

    /// Transfer `amount` SOL from `sender` to `recipient`.
    ///
    /// The amount is validated before the balance is read, and the balance
    /// is checked before anything is assembled.
    pub fn transfer_sol(
        &self,
        sender: &KeyPair,
        recipient: &Address,
        amount: Decimal,
    ) -> Result<TransferReceipt, WalletError> {
        let lamports = sol_to_lamports(amount)?;
        if lamports == 0 {
            return Err(WalletError::InvalidAmount("amount must be > 0".into()));
        }

        let from = sender.address();
        let available = self.sol_balance_lamports(&from)?;
        if lamports > available {
            return Err(WalletError::InsufficientBalance {
                requested: lamports,
                available,
            });
        }

        let transaction = build_native_transfer(&from, recipient, lamports)?;
        let signature = self
            .rpc
            .send_transaction(&transaction, sender)
            .map_err(|e| WalletError::submission("sendTransaction", e))?;

        info!(from = %from, to = %recipient, lamports, %signature, "SOL transfer submitted");
        Ok(TransferReceipt {
            transaction,
            signature,
        })
    }

    /// Balance of `owner`'s token account for `mint`, in display units.
    ///
    /// Resolves the associated token account first, creating it (paid by
    /// `payer`) when absent. A newly created account reads as zero.
    pub fn token_balance(
        &self,
        payer: &KeyPair,
        owner: &Address,
        mint: &Address,
        decimals: u8,
    ) -> Result<Decimal, WalletError> {
        let base = self.apply_query_policy(
            self.resolve(payer, mint, owner)
                .map(|account| account.base_unit_balance()),
        )?;
        to_display_units(base, decimals)
    }

    /// Transfer `amount` of `mint` from `sender` to `recipient_owner`.
    ///
    /// `decimals` must be the mint's declared decimals. The sender's balance
    /// is checked before anything is submitted. The recipient's associated
    /// token account is created, paid by the sender, when it does not exist
    /// yet.
    pub fn transfer_token(
        &self,
        sender: &KeyPair,
        recipient_owner: &Address,
        mint: &Address,
        amount: Decimal,
        decimals: u8,
    ) -> Result<TransferReceipt, WalletError> {
        let base_units = to_base_units(amount, decimals)?;
        if base_units == 0 {
            return Err(WalletError::InvalidAmount("amount must be > 0".into()));
        }

        // The sender's account is only read: a missing account holds nothing
        // and must not be created just to fail the balance check.
        let owner = sender.address();
        let source = match find_existing(&self.rpc, mint, &owner, &self.config.token_program) {
            Ok(source) => source,
            // A degraded read reports zero, which can never cover a positive amount.
            Err(e) => {
                let available = self.apply_query_policy(Err(e))?;
                return Err(WalletError::InsufficientBalance {
                    requested: base_units,
                    available,
                });
            }
        };
        let source = match source {
            Some(account) if account.base_unit_balance() >= base_units => account,
            other => {
                return Err(WalletError::InsufficientBalance {
                    requested: base_units,
                    available: other.map_or(0, |a| a.base_unit_balance()),
                });
            }
        };

        let destination = self.resolve(sender, mint, recipient_owner)?;
        debug!(
            source = %source.address,
            destination = %destination.address,
            existed = destination.existed(),
            "token accounts resolved"
        );

        let transaction = build_token_transfer(
            &self.config.token_program,
            &source.address,
            &destination.address,
            base_units,
            decimals,
            &owner,
            mint,
        )?;
        let signature = self
            .rpc
            .send_transaction(&transaction, sender)
            .map_err(|e| WalletError::submission("sendTransaction", e))?;

        info!(
            from = %owner,
            to = %recipient_owner,
            %mint,
            amount = base_units,
            decimals,
            %signature,
            "token transfer submitted"
        );
        Ok(TransferReceipt {
            transaction,
            signature,
        })
    }

    /// Mint one NFT from a candy machine through the `mintV2` RPC method.
    ///
    /// A fresh keypair is generated for the NFT mint; the payer is the
    /// collection update authority and receives the SOL payment.
    pub fn mint_nft(
        &self,
        payer: &KeyPair,
        collection: &Address,
        candy_machine: &Address,
        candy_guard: &Address,
    ) -> Result<MintReceipt, WalletError> {
        let nft_mint = KeyPair::generate().address();
        let request = build_mint_call(
            &payer.address(),
            &nft_mint,
            collection,
            candy_machine,
            candy_guard,
        )?;

        let response = self
            .rpc
            .call(&request)
            .map_err(|e| WalletError::submission(MINT_METHOD, e))?;

        info!(payer = %payer.address(), %candy_machine, %nft_mint, "mint call accepted");
        Ok(MintReceipt { nft_mint, response })
    }

    fn resolve(
        &self,
        payer: &KeyPair,
        mint: &Address,
        owner: &Address,
    ) -> Result<AssociatedAccount, WalletError> {
        resolve_or_create(&self.rpc, payer, mint, owner, &self.config.token_program)
    }

    fn apply_query_policy(&self, read: Result<u64, WalletError>) -> Result<u64, WalletError> {
        match (read, self.config.query_failure) {
            (Err(WalletError::QueryFailure { context, source }), QueryFailurePolicy::DegradeToZero) => {
                warn!(%context, error = %source, "balance query failed, reporting zero");
                Ok(0)
            }
            (read, _) => read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRpc, RpcCall};
    use chain_sol::{derive_associated_token_address, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine() -> WalletEngine<InMemoryRpc> {
        WalletEngine::new(InMemoryRpc::new(), EngineConfig::default()).unwrap()
    }

    fn sender() -> KeyPair {
        KeyPair::from_seed(&[1u8; 32])
    }

    fn is_send(call: &RpcCall) -> bool {
        matches!(call, RpcCall::SendTransaction { .. })
    }

    #[test]
    fn empty_endpoint_rejected_at_construction() {
        let config = EngineConfig {
            rpc_endpoint: String::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            WalletEngine::new(InMemoryRpc::new(), config),
            Err(WalletError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sol_balance_converts_lamports() {
        let engine = engine();
        let who = sender().address();
        engine.rpc().fund(&who, 1_500_000_000);
        assert_eq!(engine.sol_balance(&who).unwrap(), dec("1.5"));
    }

    #[test]
    fn query_failure_propagates_by_default() {
        let engine = engine();
        engine.rpc().fail_queries(true);
        let err = engine.sol_balance(&sender().address()).unwrap_err();
        assert!(matches!(err, WalletError::QueryFailure { .. }));
    }

    #[test]
    fn query_failure_degrades_when_configured() {
        let config = EngineConfig::default().with_query_failure(QueryFailurePolicy::DegradeToZero);
        let engine = WalletEngine::new(InMemoryRpc::new(), config).unwrap();
        engine.rpc().fail_queries(true);
        assert_eq!(engine.sol_balance(&sender().address()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn negative_and_zero_sol_amounts_rejected_before_any_call() {
        let engine = engine();
        let to = Address::new([2u8; 32]);
        for amount in [dec("-1"), Decimal::ZERO, dec("0.0000000001")] {
            let err = engine.transfer_sol(&sender(), &to, amount).unwrap_err();
            assert!(matches!(err, WalletError::InvalidAmount(_)), "{amount}: {err}");
        }
        assert!(engine.rpc().calls().is_empty());
    }

    #[test]
    fn overdrawn_sol_transfer_never_submits() {
        let engine = engine();
        engine.rpc().fund(&sender().address(), 1_000);
        let err = engine
            .transfer_sol(&sender(), &Address::new([2u8; 32]), dec("0.000001001"))
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientBalance {
                requested: 1_001,
                available: 1_000
            }
        ));
        assert!(!engine.rpc().calls().iter().any(is_send));
    }

    #[test]
    fn sol_transfer_moves_lamports() {
        let engine = engine();
        let from = sender();
        let to = Address::new([2u8; 32]);
        engine.rpc().fund(&from.address(), 2_000_000_000);

        let receipt = engine.transfer_sol(&from, &to, dec("0.25")).unwrap();
        let ix = &receipt.transaction.instructions()[0];
        assert_eq!(receipt.transaction.instructions().len(), 1);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.account_addresses(), vec![from.address(), to]);
        assert_eq!(engine.rpc().lamports(&to), 250_000_000);
        assert_eq!(engine.rpc().lamports(&from.address()), 1_750_000_000);
    }

    #[test]
    fn submission_error_is_wrapped() {
        let engine = engine();
        engine.rpc().fund(&sender().address(), 10_000);
        engine.rpc().fail_submissions(true);
        let err = engine
            .transfer_sol(&sender(), &Address::new([2u8; 32]), dec("0.000001"))
            .unwrap_err();
        assert!(matches!(err, WalletError::SubmissionFailure { .. }));
    }

    #[test]
    fn token_transfer_creates_recipient_account() {
        let engine = engine();
        let from = sender();
        let recipient = Address::new([3u8; 32]);
        let mint = Address::new([4u8; 32]);
        engine.rpc().fund(&from.address(), 1_000_000_000);
        let (source, _) =
            derive_associated_token_address(&from.address(), &mint, &TOKEN_PROGRAM_ID).unwrap();
        engine.rpc().open_token_account(&source, &TOKEN_PROGRAM_ID, 5_000_000);

        let receipt = engine
            .transfer_token(&from, &recipient, &mint, dec("1.25"), 6)
            .unwrap();

        let (destination, _) =
            derive_associated_token_address(&recipient, &mint, &TOKEN_PROGRAM_ID).unwrap();
        let ix = &receipt.transaction.instructions()[0];
        assert_eq!(ix.account_addresses(), vec![source, mint, destination, from.address()]);
        assert_eq!(engine.rpc().token_balance(&destination), Some(1_250_000));
        assert_eq!(engine.rpc().token_balance(&source), Some(3_750_000));
    }

    #[test]
    fn token_transfer_rejects_excess_precision() {
        let engine = engine();
        let err = engine
            .transfer_token(&sender(), &Address::new([3u8; 32]), &Address::new([4u8; 32]), dec("0.0000001"), 6)
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
        assert!(engine.rpc().calls().is_empty());
    }

    #[test]
    fn token_transfer_without_funds_is_insufficient() {
        let engine = engine();
        let from = sender();
        let recipient = Address::new([3u8; 32]);
        let mint = Address::new([4u8; 32]);
        engine.rpc().fund(&from.address(), 1_000_000_000);

        let err = engine
            .transfer_token(&from, &recipient, &mint, dec("1"), 6)
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientBalance {
                requested: 1_000_000,
                available: 0
            }
        ));

        // Neither token account is created and no rent is paid.
        assert!(!engine.rpc().calls().iter().any(is_send));
        assert_eq!(engine.rpc().lamports(&from.address()), 1_000_000_000);
        let (source, _) =
            derive_associated_token_address(&from.address(), &mint, &TOKEN_PROGRAM_ID).unwrap();
        assert!(!engine.rpc().account_exists(&source));
    }

    #[test]
    fn short_token_balance_never_submits() {
        let engine = engine();
        let from = sender();
        let mint = Address::new([4u8; 32]);
        engine.rpc().fund(&from.address(), 1_000_000_000);
        let (source, _) =
            derive_associated_token_address(&from.address(), &mint, &TOKEN_PROGRAM_ID).unwrap();
        engine.rpc().open_token_account(&source, &TOKEN_PROGRAM_ID, 999_999);

        let err = engine
            .transfer_token(&from, &Address::new([3u8; 32]), &mint, dec("1"), 6)
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientBalance {
                requested: 1_000_000,
                available: 999_999
            }
        ));
        assert!(!engine.rpc().calls().iter().any(is_send));
    }

    #[test]
    fn degraded_token_read_blocks_transfer() {
        let config = EngineConfig::default().with_query_failure(QueryFailurePolicy::DegradeToZero);
        let engine = WalletEngine::new(InMemoryRpc::new(), config).unwrap();
        engine.rpc().fail_queries(true);
        let err = engine
            .transfer_token(&sender(), &Address::new([3u8; 32]), &Address::new([4u8; 32]), dec("1"), 6)
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { available: 0, .. }));
    }

    #[test]
    fn token_balance_in_display_units() {
        let engine = engine();
        let owner = Address::new([3u8; 32]);
        let mint = Address::new([4u8; 32]);
        let (ata, _) = derive_associated_token_address(&owner, &mint, &TOKEN_PROGRAM_ID).unwrap();
        engine.rpc().open_token_account(&ata, &TOKEN_PROGRAM_ID, 42_000_000);

        let balance = engine.token_balance(&sender(), &owner, &mint, 6).unwrap();
        assert_eq!(balance, dec("42"));
    }

    #[test]
    fn mint_uses_fresh_mint_address() {
        let engine = engine();
        let payer = sender();
        let (collection, machine, guard) =
            (Address::new([5u8; 32]), Address::new([6u8; 32]), Address::new([7u8; 32]));

        let first = engine.mint_nft(&payer, &collection, &machine, &guard).unwrap();
        let second = engine.mint_nft(&payer, &collection, &machine, &guard).unwrap();
        assert_ne!(first.nft_mint, second.nft_mint);
        assert_eq!(first.response["method"], MINT_METHOD);
        assert_eq!(
            engine.rpc().calls(),
            vec![RpcCall::Call(MINT_METHOD.into()), RpcCall::Call(MINT_METHOD.into())]
        );
    }

    #[test]
    fn mint_failure_surfaces() {
        let engine = engine();
        engine.rpc().fail_submissions(true);
        let addr = Address::new([5u8; 32]);
        let err = engine.mint_nft(&sender(), &addr, &addr, &addr).unwrap_err();
        assert!(matches!(err, WalletError::SubmissionFailure { ref context, .. } if context == MINT_METHOD));
    }
}
