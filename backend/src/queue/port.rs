//! Credit Port - the queue's only way to move credits
//!
//! The queue never touches ledger storage. Every credit movement goes
//! through `CreditPort`, and every such call is treated as a potential
//! re-entry point:
//!
//! 1. The queue finishes updating its own book *before* calling the port
//! 2. It flips its `CallPhase` to `EffectsApplied` for the duration of the call
//! 3. The callee receives a read-only `MembershipView`; it can observe the
//!    queue but has no handle through which to mutate it
//!
//! A callee that could call back into the queue would therefore only ever
//! see the finished, consistent state.

use crate::core::account::{Account, Amount};
use crate::models::ledger::{CreditLedger, LedgerError};
use crate::models::queue_book::QueueBook;
use serde::{Deserialize, Serialize};

/// Progress of the queue's current call relative to its outbound transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallPhase {
    /// No call in flight
    #[default]
    Idle,

    /// Book updated; outbound credit call in flight
    EffectsApplied,
}

/// Read-only view of queue membership handed to the credit port
#[derive(Debug, Clone, Copy)]
pub struct MembershipView<'a> {
    book: &'a QueueBook,
    phase: CallPhase,
}

impl<'a> MembershipView<'a> {
    pub(crate) fn new(book: &'a QueueBook, phase: CallPhase) -> Self {
        Self { book, phase }
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn is_in_queue(&self, account: &Account) -> bool {
        self.book.contains(account)
    }

    pub fn queue_length(&self) -> usize {
        self.book.len()
    }

    /// 1-indexed position of `account`
    pub fn position_of(&self, account: &Account) -> Option<usize> {
        self.book.slot_of(account).map(|slot| slot + 1)
    }

    pub fn at(&self, slot: usize) -> Option<&'a Account> {
        self.book.at(slot)
    }

    pub fn is_consistent(&self) -> bool {
        self.book.is_consistent()
    }
}

/// Credit operations the queue relies on
///
/// Implemented by `CreditLedger`. Tests implement it with hostile callees
/// that inspect the view while a transfer is in flight.
pub trait CreditPort {
    /// Address of the ledger behind this port
    fn address(&self) -> &Account;

    fn balance_of(&self, account: &Account) -> Amount;

    fn allowance(&self, owner: &Account, spender: &Account) -> Amount;

    /// Move credits owned by `caller`
    fn transfer(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
        view: MembershipView<'_>,
    ) -> Result<(), LedgerError>;

    /// Move credits owned by `from` using `spender`'s allowance
    fn transfer_from(
        &mut self,
        spender: &Account,
        from: &Account,
        to: &Account,
        amount: Amount,
        view: MembershipView<'_>,
    ) -> Result<(), LedgerError>;
}

impl CreditPort for CreditLedger {
    fn address(&self) -> &Account {
        CreditLedger::address(self)
    }

    fn balance_of(&self, account: &Account) -> Amount {
        CreditLedger::balance_of(self, account)
    }

    fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        CreditLedger::allowance(self, owner, spender)
    }

    fn transfer(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
        _view: MembershipView<'_>,
    ) -> Result<(), LedgerError> {
        CreditLedger::transfer(self, caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Account,
        from: &Account,
        to: &Account,
        amount: Amount,
        _view: MembershipView<'_>,
    ) -> Result<(), LedgerError> {
        CreditLedger::transfer_from(self, spender, from, to, amount)
    }
}
