//! Funds custody boundary
//!
//! The engine moves value only through this trait. A purchase submits both
//! legs of the split (seller proceeds and treasury fee) in a single call, and
//! the implementation must apply them all-or-nothing.

use crate::error::{Error, Result};
use crate::types::AccountId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One value movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    /// Source account
    pub from: AccountId,
    /// Destination account
    pub to: AccountId,
    /// Amount to move
    pub amount: u64,
}

/// External funds custodian
pub trait FundsCustody: Send + Sync {
    /// Disposable balance of an account
    fn balance_of(&self, account: &AccountId) -> u64;

    /// Apply all legs atomically, or none of them
    ///
    /// Fails with `InsufficientFunds` if any source cannot cover its total
    /// across the legs, or `ArithmeticOverflow` if a destination balance
    /// would overflow.
    fn transfer_multi(&self, legs: &[TransferLeg]) -> Result<()>;
}

/// In-process funds ledger
///
/// Balances live under one mutex so multi-leg transfers are trivially
/// all-or-nothing: new balances are computed for every leg first and only
/// then written back.
#[derive(Debug, Default)]
pub struct InMemoryFunds {
    balances: Mutex<HashMap<AccountId, u64>>,
}

impl InMemoryFunds {
    /// Create an empty funds ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account (test and demo funding)
    pub fn deposit(&self, account: &AccountId, amount: u64) -> Result<()> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(Error::ArithmeticOverflow)?;
        Ok(())
    }
}

impl FundsCustody for InMemoryFunds {
    fn balance_of(&self, account: &AccountId) -> u64 {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    fn transfer_multi(&self, legs: &[TransferLeg]) -> Result<()> {
        let mut balances = self.balances.lock();

        // Stage every new balance before touching the map.
        let mut staged: HashMap<AccountId, u64> = HashMap::new();
        let current = |staged: &HashMap<AccountId, u64>,
                       balances: &HashMap<AccountId, u64>,
                       account: &AccountId| {
            staged
                .get(account)
                .copied()
                .unwrap_or_else(|| balances.get(account).copied().unwrap_or(0))
        };

        for leg in legs {
            let from_balance = current(&staged, &balances, &leg.from);
            let new_from = from_balance
                .checked_sub(leg.amount)
                .ok_or(Error::InsufficientFunds {
                    balance: from_balance,
                    required: leg.amount,
                })?;
            staged.insert(leg.from.clone(), new_from);

            let to_balance = current(&staged, &balances, &leg.to);
            let new_to = to_balance
                .checked_add(leg.amount)
                .ok_or(Error::ArithmeticOverflow)?;
            staged.insert(leg.to.clone(), new_to);
        }

        for (account, balance) in staged {
            balances.insert(account, balance);
        }

        Ok(())
    }
}
