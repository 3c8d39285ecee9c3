//! In-memory token ledger for balances and claims.
//!
//! Stands in for the token contract and the stealth account when no chain is
//! available: senders credit stealth accounts, recipients claim from them.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{error, info, instrument};

use stealthflow_core::error::{Result, StealthFlowError};
use stealthflow_core::traits::{BalanceLookup, ClaimExecutor};
use stealthflow_core::types::{ClaimRequest, StealthAccountAddress, U256};
use stealthflow_crypto::{derive_account_address, AccountDeployment};

/// Balances of one token, keyed by account word.
#[derive(Debug)]
pub struct MemoryLedger {
    token: U256,
    deployment: AccountDeployment,
    balances: DashMap<U256, U256>,
    claims: AtomicU64,
}

impl MemoryLedger {
    /// Creates an empty ledger for `token` with the default deployment.
    pub fn new(token: U256) -> Self {
        Self::with_deployment(token, AccountDeployment::default())
    }

    /// Creates an empty ledger whose stealth accounts use `deployment`.
    pub fn with_deployment(token: U256, deployment: AccountDeployment) -> Self {
        Self {
            token,
            deployment,
            balances: DashMap::new(),
            claims: AtomicU64::new(0),
        }
    }

    /// Token tracked by this ledger.
    pub fn token(&self) -> U256 {
        self.token
    }

    /// Adds `amount` to `account`.
    pub fn credit(&self, account: U256, amount: U256) -> Result<()> {
        let mut entry = self.balances.entry(account).or_insert(U256::ZERO);
        let sum = entry.to_biguint() + amount.to_biguint();
        *entry = U256::from_biguint(&sum)
            .map_err(|_| StealthFlowError::InvalidAmount(format!("balance of {:#x} overflows", account)))?;
        Ok(())
    }

    /// Current balance of any account.
    pub fn balance(&self, account: &U256) -> U256 {
        self.balances.get(account).map(|b| *b).unwrap_or(U256::ZERO)
    }

    /// Number of executed claims.
    pub fn claim_count(&self) -> u64 {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceLookup for MemoryLedger {
    async fn balance_of(&self, address: &StealthAccountAddress) -> Result<U256> {
        Ok(self.balance(address.as_word()))
    }
}

#[async_trait]
impl ClaimExecutor for MemoryLedger {
    /// Moves `amount` from the stealth account to the destination.
    ///
    /// The key must control the account: its public key must derive the
    /// funded address.
    #[instrument(skip(self, request), fields(account = %request.stealth_address))]
    async fn execute_claim(&self, request: &ClaimRequest) -> Result<String> {
        if request.token != self.token {
            return Err(StealthFlowError::ClaimError(format!(
                "ledger tracks {:#x}, claim is for {:#x}",
                self.token, request.token
            )));
        }

        let controlled = derive_account_address(&request.stealth_priv.public_key()?, &self.deployment)?;
        if controlled != request.stealth_address {
            error!(expected = %request.stealth_address, derived = %controlled, "claim key does not control account");
            return Err(StealthFlowError::SoundnessViolation(format!(
                "key derives {} but funds are at {}",
                controlled, request.stealth_address
            )));
        }

        let account = *request.stealth_address.as_word();
        {
            let mut balance = self.balances.entry(account).or_insert(U256::ZERO);
            if *balance < request.amount {
                return Err(StealthFlowError::InsufficientBalance {
                    available: balance.to_string(),
                    required: request.amount.to_string(),
                });
            }
            let rest = balance.to_biguint() - request.amount.to_biguint();
            *balance = U256::from_biguint(&rest)?;
        }
        self.credit(request.destination, request.amount)?;

        let n = self.claims.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = format!("{:#066x}", n);
        info!(tx = %tx, amount = %request.amount, "claim executed");
        Ok(tx)
    }
}
