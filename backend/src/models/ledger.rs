//! Credit Ledger
//!
//! Fungible balance store for the queue credit ("WaitToken", symbol WAIT).
//!
//! - Balances and allowances keyed by account
//! - Total supply counter
//! - A single minter (the issuer), set exactly once via `set_issuer`
//!
//! # Critical Invariants
//!
//! 1. **Supply Conservation**: sum of all balances == total supply
//! 2. **Non-negative**: amounts are unsigned; every decrement is checked
//!    against the current value before anything is written
//! 3. **All-or-nothing**: an operation that returns `Err` has changed nothing
//!    and logged nothing

use crate::core::account::{Account, Amount};
use crate::core::errors::ErrorKind;
use crate::models::event::{Event, EventLog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during ledger operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Only issuer can mint")]
    NotIssuer { caller: Account },

    #[error("Issuer already set")]
    IssuerAlreadySet { issuer: Account },

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("Arithmetic overflow")]
    Overflow,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotIssuer { .. } => ErrorKind::Authorization,
            LedgerError::IssuerAlreadySet { .. } => ErrorKind::State,
            LedgerError::InvalidAddress | LedgerError::ZeroAmount | LedgerError::Overflow => {
                ErrorKind::Input
            }
            LedgerError::InsufficientBalance { .. } | LedgerError::InsufficientAllowance { .. } => {
                ErrorKind::InsufficientFunds
            }
        }
    }
}

/// Read-only token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "WaitToken".to_string(),
            symbol: "WAIT".to_string(),
            decimals: 18,
        }
    }
}

/// Fungible credit ledger
///
/// # Example
/// ```
/// use waitlist_core_rs::{Account, CreditLedger, TokenMetadata};
///
/// let mut ledger = CreditLedger::new(TokenMetadata::default());
/// let issuer = Account::new("0x155");
/// let alice = Account::new("0xa11ce");
///
/// ledger.set_issuer(&alice, issuer.clone()).unwrap();
/// ledger.mint(&issuer, &alice, 10).unwrap();
///
/// assert_eq!(ledger.balance_of(&alice), 10);
/// assert_eq!(ledger.total_supply(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedger {
    /// The ledger's own address (what other components hold as a reference)
    address: Account,

    metadata: TokenMetadata,

    /// Account → balance. Entries persist at zero once created.
    balances: BTreeMap<Account, Amount>,

    /// Owner → spender → allowance
    allowances: BTreeMap<Account, BTreeMap<Account, Amount>>,

    total_supply: Amount,

    /// Minter; written once by `set_issuer`
    issuer: Option<Account>,

    events: EventLog,
}

impl CreditLedger {
    /// Create an empty ledger at a freshly generated address
    pub fn new(metadata: TokenMetadata) -> Self {
        Self::with_address(Account::generate(), metadata)
    }

    /// Create an empty ledger at a given address
    pub fn with_address(address: Account, metadata: TokenMetadata) -> Self {
        Self {
            address,
            metadata,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: 0,
            issuer: None,
            events: EventLog::new(),
        }
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    /// Configured minter, `None` until `set_issuer` succeeds
    pub fn issuer(&self) -> Option<&Account> {
        self.issuer.as_ref()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// All balance entries (including zero balances)
    pub fn balances(&self) -> &BTreeMap<Account, Amount> {
        &self.balances
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Check that balances sum to the total supply
    pub fn supply_is_conserved(&self) -> bool {
        self.balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
            == Some(self.total_supply)
    }

    /// Configure the single minter
    ///
    /// Any caller may do this, but only once: the first successful call wins
    /// and there is no way to change the issuer afterwards.
    pub fn set_issuer(&mut self, caller: &Account, issuer: Account) -> Result<(), LedgerError> {
        if issuer.is_null() {
            return Err(LedgerError::InvalidAddress);
        }
        if let Some(existing) = &self.issuer {
            warn!(%caller, issuer = %existing, "rejected second set_issuer");
            return Err(LedgerError::IssuerAlreadySet {
                issuer: existing.clone(),
            });
        }

        debug!(%caller, %issuer, "issuer set");
        self.issuer = Some(issuer.clone());
        self.events.log(Event::IssuerSet { issuer });
        Ok(())
    }

    /// Create `amount` new credits for `to` (issuer only)
    pub fn mint(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if self.issuer.as_ref() != Some(caller) {
            warn!(%caller, "rejected mint from non-issuer");
            return Err(LedgerError::NotIssuer {
                caller: caller.clone(),
            });
        }
        if to.is_null() {
            return Err(LedgerError::InvalidAddress);
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_supply = new_supply;
        self.balances.insert(to.clone(), new_balance);

        debug!(%to, amount, total_supply = new_supply, "minted");
        self.events.log(Event::Transfer {
            from: Account::null(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    /// Move `amount` from the caller to `to`
    pub fn transfer(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.move_balance(caller, to, amount)
    }

    /// Overwrite the allowance `spender` may draw from `owner`
    pub fn approve(
        &mut self,
        owner: &Account,
        spender: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if spender.is_null() || owner.is_null() {
            return Err(LedgerError::InvalidAddress);
        }

        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), amount);

        debug!(%owner, %spender, amount, "approval");
        self.events.log(Event::Approval {
            owner: owner.clone(),
            spender: spender.clone(),
            amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    ///
    /// Allowance is checked before balance. An allowance of `Amount::MAX`
    /// is treated as unlimited and is not decremented.
    pub fn transfer_from(
        &mut self,
        spender: &Account,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                required: amount,
                available: allowed,
            });
        }

        self.move_balance(from, to, amount)?;

        if allowed != Amount::MAX {
            self.allowances
                .entry(from.clone())
                .or_default()
                .insert(spender.clone(), allowed - amount);
        }
        Ok(())
    }

    /// Debit `from` and credit `to` atomically
    fn move_balance(
        &mut self,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if to.is_null() || from.is_null() {
            return Err(LedgerError::InvalidAddress);
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }

        if from != to {
            let to_balance = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            self.balances.insert(from.clone(), from_balance - amount);
            self.balances.insert(to.clone(), to_balance);
        }

        debug!(%from, %to, amount, "transfer");
        self.events.log(Event::Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}
