//! An in-memory [`SolanaRpc`] ledger.
//!
//! Holds native balances, token accounts and token balances, applies the
//! System transfer, ATA create-idempotent and SPL `TransferChecked`
//! instructions the engine emits, and records every call it receives. Used
//! by the test suites and handy for offline demos.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};

use chain_sol::{
    Address, Instruction, Transaction, ASSOCIATED_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID,
    TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

use crate::keys::KeyPair;
use crate::rpc::{AccountInfo, RpcError, RpcRequest, SolanaRpc};

/// Rent-exempt minimum for a 165-byte token account.
pub const TOKEN_ACCOUNT_RENT: u64 = 2_039_280;

/// Size of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// One recorded RPC invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    GetBalance(Address),
    GetAccountInfo(Address),
    GetTokenAccountBalance(Address),
    SendTransaction { fee_payer: Address, instructions: usize },
    Call(String),
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    lamports: HashMap<Address, u64>,
    accounts: HashMap<Address, AccountInfo>,
    token_balances: HashMap<Address, u64>,
}

#[derive(Debug, Default)]
struct State {
    ledger: Ledger,
    calls: Vec<RpcCall>,
    submitted: Vec<Transaction>,
    fail_queries: bool,
    fail_submissions: bool,
    call_response: Option<Value>,
    signatures: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryRpc {
    state: Mutex<State>,
}

impl InMemoryRpc {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Credit native lamports to `address`.
    pub fn fund(&self, address: &Address, lamports: u64) {
        *self.state().ledger.lamports.entry(*address).or_default() += lamports;
    }

    /// Create a token account at `address` holding `balance` base units.
    pub fn open_token_account(&self, address: &Address, token_program: &Address, balance: u64) {
        let mut state = self.state();
        state.ledger.accounts.insert(*address, token_account_info(token_program));
        state.ledger.token_balances.insert(*address, balance);
    }

    /// Make every read fail with a transport error.
    pub fn fail_queries(&self, fail: bool) {
        self.state().fail_queries = fail;
    }

    /// Make every submission (`sendTransaction` and `call`) fail.
    pub fn fail_submissions(&self, fail: bool) {
        self.state().fail_submissions = fail;
    }

    /// Response returned by `call`. Defaults to an echo of the method.
    pub fn respond_to_calls_with(&self, response: Value) {
        self.state().call_response = Some(response);
    }

    pub fn lamports(&self, address: &Address) -> u64 {
        self.state().ledger.lamports.get(address).copied().unwrap_or(0)
    }

    pub fn token_balance(&self, address: &Address) -> Option<u64> {
        self.state().ledger.token_balances.get(address).copied()
    }

    pub fn account_exists(&self, address: &Address) -> bool {
        self.state().ledger.accounts.contains_key(address)
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.state().calls.clone()
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.state().submitted.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl SolanaRpc for InMemoryRpc {
    fn get_balance(&self, address: &Address) -> Result<u64, RpcError> {
        let mut state = self.state();
        state.calls.push(RpcCall::GetBalance(*address));
        check_queries(&state)?;
        Ok(state.ledger.lamports.get(address).copied().unwrap_or(0))
    }

    fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>, RpcError> {
        let mut state = self.state();
        state.calls.push(RpcCall::GetAccountInfo(*address));
        check_queries(&state)?;
        Ok(state.ledger.accounts.get(address).cloned())
    }

    fn get_token_account_balance(&self, address: &Address) -> Result<u64, RpcError> {
        let mut state = self.state();
        state.calls.push(RpcCall::GetTokenAccountBalance(*address));
        check_queries(&state)?;
        state.ledger.token_balances.get(address).copied().ok_or_else(|| RpcError::Node {
            code: -32602,
            message: format!("could not find token account {address}"),
        })
    }

    fn send_transaction(
        &self,
        transaction: &Transaction,
        signer: &KeyPair,
    ) -> Result<String, RpcError> {
        let mut state = self.state();
        state.calls.push(RpcCall::SendTransaction {
            fee_payer: *transaction.fee_payer(),
            instructions: transaction.instructions().len(),
        });
        if state.fail_submissions {
            return Err(RpcError::Transport("connection reset".into()));
        }
        if signer.address() != *transaction.fee_payer() {
            return Err(RpcError::Node {
                code: -32003,
                message: "signature verification failure".into(),
            });
        }

        // Apply against a copy so a failing instruction leaves no trace.
        let mut ledger = state.ledger.clone();
        for ix in transaction.instructions() {
            apply(&mut ledger, ix, &signer.address())?;
        }
        state.ledger = ledger;
        state.submitted.push(transaction.clone());
        state.signatures += 1;
        Ok(format!("mem-sig-{}", state.signatures))
    }

    fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let mut state = self.state();
        state.calls.push(RpcCall::Call(request.method.clone()));
        if state.fail_submissions {
            return Err(RpcError::Transport("connection reset".into()));
        }
        Ok(state
            .call_response
            .clone()
            .unwrap_or_else(|| json!({ "method": request.method, "accepted": true })))
    }
}

fn check_queries(state: &State) -> Result<(), RpcError> {
    if state.fail_queries {
        return Err(RpcError::Transport("node unreachable".into()));
    }
    Ok(())
}

fn token_account_info(token_program: &Address) -> AccountInfo {
    AccountInfo {
        lamports: TOKEN_ACCOUNT_RENT,
        owner: *token_program,
        data: vec![0u8; TOKEN_ACCOUNT_LEN],
        executable: false,
        rent_epoch: 0,
    }
}

fn simulation_failure(message: impl Into<String>) -> RpcError {
    RpcError::Node {
        code: -32002,
        message: message.into(),
    }
}

fn u64_at(data: &[u8], offset: usize) -> Result<u64, RpcError> {
    data.get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| simulation_failure("instruction data too short"))
}

fn debit(balances: &mut HashMap<Address, u64>, address: &Address, amount: u64) -> Result<(), RpcError> {
    let balance = balances.entry(*address).or_default();
    *balance = balance
        .checked_sub(amount)
        .ok_or_else(|| simulation_failure(format!("insufficient funds in {address}")))?;
    Ok(())
}

fn apply(ledger: &mut Ledger, ix: &Instruction, signer: &Address) -> Result<(), RpcError> {
    let accounts = ix.account_addresses();
    let account = |i: usize| {
        accounts
            .get(i)
            .copied()
            .ok_or_else(|| simulation_failure("missing instruction account"))
    };

    if ix.program_id == SYSTEM_PROGRAM_ID {
        let (from, to) = (account(0)?, account(1)?);
        if from != *signer {
            return Err(simulation_failure("transfer source did not sign"));
        }
        let lamports = u64_at(&ix.data, 4)?;
        debit(&mut ledger.lamports, &from, lamports)?;
        *ledger.lamports.entry(to).or_default() += lamports;
    } else if ix.program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
        let (payer, ata, token_program) = (account(0)?, account(1)?, account(5)?);
        if !ledger.accounts.contains_key(&ata) {
            debit(&mut ledger.lamports, &payer, TOKEN_ACCOUNT_RENT)?;
            ledger.accounts.insert(ata, token_account_info(&token_program));
            ledger.token_balances.insert(ata, 0);
        }
    } else if ix.program_id == TOKEN_PROGRAM_ID || ix.program_id == TOKEN_2022_PROGRAM_ID {
        let (source, destination) = (account(0)?, account(2)?);
        let amount = u64_at(&ix.data, 1)?;
        if !ledger.accounts.contains_key(&destination) {
            return Err(simulation_failure(format!("token account {destination} not found")));
        }
        debit(&mut ledger.token_balances, &source, amount)?;
        *ledger.token_balances.entry(destination).or_default() += amount;
    } else {
        return Err(simulation_failure(format!("unknown program {}", ix.program_id)));
    }
    Ok(())
}
