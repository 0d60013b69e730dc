//! Credit Issuer
//!
//! Sells credits for a fixed external payment.
//!
//! # Purchase Flow
//!
//! ```text
//! buyer --(payment == unit_price)--> Issuer.buy
//!                                       |  bonus  = balance_of(buyer)   (read BEFORE minting)
//!                                       |  minted = base_issuance + bonus
//!                                       v
//!                              CreditLedger.mint(buyer, minted)
//! ```
//!
//! Because the bonus is the balance before the mint, repeated purchases
//! compound: `B[n] = 2 * B[n-1] + base`. With base 1 a fresh account goes
//! 1, 3, 7, 15, 31, ...
//!
//! # Critical Invariants
//!
//! - **Exact payment**: under- and over-payment are both rejected
//! - **Payment accounting**: `collected` == payments received − amounts withdrawn
//! - **Atomicity**: if the mint fails the payment is not counted

use crate::core::access::Custodian;
use crate::core::account::{Account, Amount};
use crate::core::errors::ErrorKind;
use crate::models::event::{Event, EventLog};
use crate::models::ledger::{CreditLedger, LedgerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during issuer operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssuerError {
    #[error("Invalid ledger address")]
    InvalidLedger,

    #[error("Ledger address mismatch: expected {expected}, got {actual}")]
    LedgerMismatch { expected: Account, actual: Account },

    #[error("Must send exactly the token price: expected {expected}, received {received}")]
    InexactPayment { expected: Amount, received: Amount },

    #[error("Only custodian can call this")]
    NotCustodian { caller: Account },

    #[error("No funds to withdraw")]
    NothingToWithdraw,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IssuerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssuerError::InvalidLedger
            | IssuerError::LedgerMismatch { .. }
            | IssuerError::Overflow => ErrorKind::Input,
            IssuerError::InexactPayment { .. } => ErrorKind::ExactPayment,
            IssuerError::NotCustodian { .. } => ErrorKind::Authorization,
            IssuerError::NothingToWithdraw => ErrorKind::State,
            IssuerError::Ledger(e) => e.kind(),
        }
    }
}

/// Funds released by `withdraw`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: Account,
    pub amount: Amount,
}

/// Credit issuer
///
/// # Example
/// ```
/// use waitlist_core_rs::{Account, CreditIssuer, CreditLedger, TokenMetadata};
///
/// let owner = Account::new("0x0wner");
/// let buyer = Account::new("0xb0b");
/// let mut ledger = CreditLedger::new(TokenMetadata::default());
/// let mut issuer = CreditIssuer::new(owner.clone(), ledger.address().clone(), 10, 1).unwrap();
/// ledger.set_issuer(&owner, issuer.address().clone()).unwrap();
///
/// assert_eq!(issuer.buy(&buyer, 10, &mut ledger).unwrap(), 1);
/// assert_eq!(issuer.buy(&buyer, 10, &mut ledger).unwrap(), 2);
/// assert_eq!(ledger.balance_of(&buyer), 3);
/// assert_eq!(issuer.collected(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditIssuer {
    /// The issuer's own address (the ledger's minter)
    address: Account,

    /// Address of the ledger this issuer mints on
    ledger: Account,

    /// Exact payment accepted per purchase
    unit_price: Amount,

    /// Credits minted per purchase before the bonus
    base_issuance: Amount,

    /// Payments received and not yet withdrawn
    collected: Amount,

    custodian: Custodian,

    events: EventLog,
}

impl CreditIssuer {
    /// Create an issuer at a freshly generated address
    ///
    /// `custodian` is the deploying account; it alone may withdraw.
    pub fn new(
        custodian: Account,
        ledger: Account,
        unit_price: Amount,
        base_issuance: Amount,
    ) -> Result<Self, IssuerError> {
        Self::with_address(Account::generate(), custodian, ledger, unit_price, base_issuance)
    }

    /// Create an issuer at a given address
    pub fn with_address(
        address: Account,
        custodian: Account,
        ledger: Account,
        unit_price: Amount,
        base_issuance: Amount,
    ) -> Result<Self, IssuerError> {
        if ledger.is_null() {
            return Err(IssuerError::InvalidLedger);
        }

        Ok(Self {
            address,
            ledger,
            unit_price,
            base_issuance,
            collected: 0,
            custodian: Custodian::appoint(custodian),
            events: EventLog::new(),
        })
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn ledger(&self) -> &Account {
        &self.ledger
    }

    pub fn unit_price(&self) -> Amount {
        self.unit_price
    }

    pub fn base_issuance(&self) -> Amount {
        self.base_issuance
    }

    /// Accumulated payment awaiting withdrawal
    pub fn collected(&self) -> Amount {
        self.collected
    }

    pub fn custodian(&self) -> &Account {
        self.custodian.account()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Credits the next purchase by `buyer` would mint
    pub fn quote(&self, buyer: &Account, ledger: &CreditLedger) -> Result<Amount, IssuerError> {
        self.base_issuance
            .checked_add(ledger.balance_of(buyer))
            .ok_or(IssuerError::Overflow)
    }

    /// Sell credits to `caller` for exactly `unit_price`
    ///
    /// Returns the amount minted.
    pub fn buy(
        &mut self,
        caller: &Account,
        payment: Amount,
        ledger: &mut CreditLedger,
    ) -> Result<Amount, IssuerError> {
        self.check_ledger(ledger)?;
        if payment != self.unit_price {
            return Err(IssuerError::InexactPayment {
                expected: self.unit_price,
                received: payment,
            });
        }

        let minted = self.quote(caller, ledger)?;
        let collected = self
            .collected
            .checked_add(payment)
            .ok_or(IssuerError::Overflow)?;

        // Own bookkeeping first, then the call into the ledger
        let previous = std::mem::replace(&mut self.collected, collected);
        if let Err(err) = ledger.mint(&self.address, caller, minted) {
            self.collected = previous;
            return Err(err.into());
        }

        debug!(buyer = %caller, minted, collected, "credits purchased");
        self.events.log(Event::TokenPurchased {
            buyer: caller.clone(),
            amount: minted,
        });
        Ok(minted)
    }

    /// Release all accumulated payment to the custodian
    pub fn withdraw(&mut self, caller: &Account) -> Result<Payout, IssuerError> {
        if !self.custodian.is(caller) {
            warn!(%caller, "rejected withdraw from non-custodian");
            return Err(IssuerError::NotCustodian {
                caller: caller.clone(),
            });
        }
        if self.collected == 0 {
            return Err(IssuerError::NothingToWithdraw);
        }

        let amount = std::mem::take(&mut self.collected);
        let to = self.custodian.account().clone();

        debug!(custodian = %to, amount, "funds withdrawn");
        self.events.log(Event::FundsWithdrawn {
            custodian: to.clone(),
            amount,
        });
        Ok(Payout { to, amount })
    }

    fn check_ledger(&self, ledger: &CreditLedger) -> Result<(), IssuerError> {
        if ledger.address() != &self.ledger {
            return Err(IssuerError::LedgerMismatch {
                expected: self.ledger.clone(),
                actual: ledger.address().clone(),
            });
        }
        Ok(())
    }
}
