//! Queue Ledger
//!
//! First-come-first-served queue where a slot costs a fixed number of
//! credits.
//!
//! # Membership State Machine
//!
//! ```text
//!              join (pay registration_cost)
//!   NotQueued ─────────────────────────────▶ Queued
//!       ▲                                      │
//!       │  leave (refund withdrawal_refund)    │
//!       │  evict (head only, full refund)      │
//!       └──────────────────────────────────────┘
//! ```
//!
//! # Storage and Logic
//!
//! Persistent state lives in `QueueStorage`, a serde layout tagged with a
//! layout version. `QueueLedger` is the logic bound to that storage. The
//! logic can be replaced (`attach`) without re-running initialization, and
//! initialization itself runs exactly once per storage.
//!
//! # Critical Invariants
//!
//! 1. **Book consistency**: order and index agree after every call
//! 2. **Effects before interactions**: the book is fully updated before any
//!    credit call, and restored if that call fails
//! 3. **Solvency**: the queue's credit holding covers a full refund for every
//!    member (leave refunds less than the cost, evict refunds exactly it)

use super::port::{CallPhase, CreditPort, MembershipView};
use crate::core::access::Custodian;
use crate::core::account::{Account, Amount};
use crate::core::errors::ErrorKind;
use crate::models::event::{Event, EventLog};
use crate::models::ledger::LedgerError;
use crate::models::queue_book::QueueBook;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Logic version reported by `version()`
pub const VERSION: &str = "1.0.0";

/// Version of the `QueueStorage` layout this logic understands
pub const STORAGE_LAYOUT_VERSION: u32 = 1;

/// Initializer version written by `initialize`
const INITIALIZER_VERSION: u8 = 1;

/// Errors that can occur during queue operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid ledger address")]
    InvalidLedger,

    #[error("Ledger address mismatch: expected {expected}, got {actual}")]
    LedgerMismatch { expected: Account, actual: Account },

    #[error("Invalid initialization")]
    InvalidInitialization,

    #[error("Not initialized")]
    NotInitialized,

    #[error("Storage layout mismatch: expected {expected}, found {found}")]
    LayoutMismatch { expected: u32, found: u32 },

    #[error("Corrupt storage: queue order and index disagree")]
    CorruptStorage,

    #[error("Already in queue")]
    AlreadyQueued,

    #[error("Not in queue")]
    NotQueued,

    #[error("Queue is empty")]
    Empty,

    #[error("Index out of bounds: index {index}, length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Insufficient token balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Only custodian can call this")]
    NotCustodian { caller: Account },

    #[error("Reentrant call")]
    Reentrant,

    #[error(transparent)]
    Credit(#[from] LedgerError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::InvalidLedger
            | QueueError::LedgerMismatch { .. }
            | QueueError::IndexOutOfBounds { .. } => ErrorKind::Input,
            QueueError::InvalidInitialization
            | QueueError::NotInitialized
            | QueueError::LayoutMismatch { .. }
            | QueueError::CorruptStorage
            | QueueError::AlreadyQueued
            | QueueError::NotQueued
            | QueueError::Empty
            | QueueError::Reentrant => ErrorKind::State,
            QueueError::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,
            QueueError::NotCustodian { .. } => ErrorKind::Authorization,
            QueueError::Credit(e) => e.kind(),
        }
    }
}

/// Fixed credit amounts for joining and leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTerms {
    /// Credits pulled from an account on join (and refunded in full on evict)
    pub registration_cost: Amount,

    /// Credits returned on voluntary leave; the rest stays with the queue
    pub withdrawal_refund: Amount,
}

/// Persistent queue state
///
/// Everything that must survive a logic replacement lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStorage {
    layout_version: u32,

    /// Stable address of the queue (its credit holding account)
    address: Account,

    /// Initializer version that has run (0 = never)
    initialized: u8,

    /// Credit ledger the queue charges against
    ledger: Option<Account>,

    custodian: Option<Custodian>,

    terms: QueueTerms,

    book: QueueBook,

    events: EventLog,
}

impl QueueStorage {
    /// Blank, uninitialized storage at `address`
    pub fn new(address: Account, terms: QueueTerms) -> Self {
        Self {
            layout_version: STORAGE_LAYOUT_VERSION,
            address,
            initialized: 0,
            ledger: None,
            custodian: None,
            terms,
            book: QueueBook::new(),
            events: EventLog::new(),
        }
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn layout_version(&self) -> u32 {
        self.layout_version
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized != 0
    }

    pub fn ledger(&self) -> Option<&Account> {
        self.ledger.as_ref()
    }

    pub fn terms(&self) -> &QueueTerms {
        &self.terms
    }

    pub fn book(&self) -> &QueueBook {
        &self.book
    }
}

/// Queue logic bound to its storage
///
/// # Example
/// ```
/// use waitlist_core_rs::{Account, CreditLedger, QueueLedger, QueueTerms, TokenMetadata};
///
/// let owner = Account::new("0x0wner");
/// let alice = Account::new("0xa11ce");
/// let mut ledger = CreditLedger::new(TokenMetadata::default());
/// ledger.set_issuer(&owner, owner.clone()).unwrap();
/// ledger.mint(&owner, &alice, 2).unwrap();
///
/// let terms = QueueTerms { registration_cost: 2, withdrawal_refund: 1 };
/// let mut queue = QueueLedger::deploy(Account::new("0x9ue"), terms);
/// queue.initialize(&owner, ledger.address()).unwrap();
///
/// ledger.approve(&alice, queue.address(), 2).unwrap();
/// assert_eq!(queue.join(&alice, &mut ledger).unwrap(), 1);
/// assert_eq!(queue.position_of(&alice).unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QueueLedger {
    storage: QueueStorage,
    phase: CallPhase,
}

impl QueueLedger {
    /// Deploy uninitialized queue logic over blank storage
    pub fn deploy(address: Account, terms: QueueTerms) -> Self {
        Self {
            storage: QueueStorage::new(address, terms),
            phase: CallPhase::Idle,
        }
    }

    /// Bind the ledger and appoint `caller` as custodian
    ///
    /// Runs once per storage; later attempts fail with `InvalidInitialization`.
    pub fn initialize(&mut self, caller: &Account, ledger: &Account) -> Result<(), QueueError> {
        if self.storage.is_initialized() {
            warn!(%caller, "rejected re-initialization");
            return Err(QueueError::InvalidInitialization);
        }
        if ledger.is_null() {
            return Err(QueueError::InvalidLedger);
        }

        self.storage.initialized = INITIALIZER_VERSION;
        self.storage.ledger = Some(ledger.clone());
        self.storage.custodian = Some(Custodian::appoint(caller.clone()));

        debug!(custodian = %caller, %ledger, "queue initialized");
        self.storage.events.log(Event::Initialized {
            version: INITIALIZER_VERSION,
        });
        Ok(())
    }

    /// Bind this logic to existing, already initialized storage
    pub fn attach(storage: QueueStorage) -> Result<Self, QueueError> {
        if storage.layout_version != STORAGE_LAYOUT_VERSION {
            return Err(QueueError::LayoutMismatch {
                expected: STORAGE_LAYOUT_VERSION,
                found: storage.layout_version,
            });
        }
        if !storage.is_initialized() {
            return Err(QueueError::NotInitialized);
        }
        if !storage.book.is_consistent() {
            return Err(QueueError::CorruptStorage);
        }

        Ok(Self {
            storage,
            phase: CallPhase::Idle,
        })
    }

    /// Check `caller` may replace the logic behind this storage
    pub fn authorize_upgrade(&self, caller: &Account) -> Result<(), QueueError> {
        self.ensure_custodian(caller)
    }

    pub(crate) fn record_upgrade(&mut self) {
        self.storage.events.log(Event::Upgraded {
            version: VERSION.to_string(),
        });
    }

    pub fn storage(&self) -> &QueueStorage {
        &self.storage
    }

    pub fn into_storage(self) -> QueueStorage {
        self.storage
    }

    // ========================================================================
    // Read operations
    // ========================================================================

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn address(&self) -> &Account {
        &self.storage.address
    }

    pub fn ledger(&self) -> Option<&Account> {
        self.storage.ledger.as_ref()
    }

    pub fn custodian(&self) -> Option<&Account> {
        self.storage.custodian.as_ref().map(Custodian::account)
    }

    pub fn registration_cost(&self) -> Amount {
        self.storage.terms.registration_cost
    }

    pub fn withdrawal_refund(&self) -> Amount {
        self.storage.terms.withdrawal_refund
    }

    pub fn events(&self) -> &EventLog {
        &self.storage.events
    }

    /// Stays `EffectsApplied` if a credit call unwinds; every later
    /// state-changing call is then refused with `Reentrant`.
    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn is_in_queue(&self, account: &Account) -> bool {
        self.storage.book.contains(account)
    }

    pub fn queue_length(&self) -> usize {
        self.storage.book.len()
    }

    /// Account at 0-based `index`
    pub fn queue_at(&self, index: usize) -> Result<&Account, QueueError> {
        self.storage
            .book
            .at(index)
            .ok_or(QueueError::IndexOutOfBounds {
                index,
                len: self.storage.book.len(),
            })
    }

    /// 1-indexed position of `caller`
    pub fn position_of(&self, caller: &Account) -> Result<usize, QueueError> {
        self.storage
            .book
            .slot_of(caller)
            .map(|slot| slot + 1)
            .ok_or(QueueError::NotQueued)
    }

    /// Members in service order
    pub fn members(&self) -> &[Account] {
        self.storage.book.members()
    }

    pub fn is_consistent(&self) -> bool {
        self.storage.book.is_consistent()
    }

    // ========================================================================
    // State-changing operations
    // ========================================================================

    /// Pay the registration cost and take the next slot
    ///
    /// Returns the 1-indexed position.
    pub fn join<C: CreditPort + ?Sized>(
        &mut self,
        caller: &Account,
        credits: &mut C,
    ) -> Result<usize, QueueError> {
        self.ensure_ready(credits)?;
        if self.storage.book.contains(caller) {
            return Err(QueueError::AlreadyQueued);
        }

        let cost = self.storage.terms.registration_cost;
        let available = credits.balance_of(caller);
        if available < cost {
            return Err(QueueError::InsufficientBalance {
                required: cost,
                available,
            });
        }

        let slot = self
            .storage
            .book
            .push(caller.clone())
            .ok_or(QueueError::AlreadyQueued)?;

        self.phase = CallPhase::EffectsApplied;
        let holding = &self.storage.address;
        let pulled = credits.transfer_from(
            holding,
            caller,
            holding,
            cost,
            MembershipView::new(&self.storage.book, self.phase),
        );
        self.phase = CallPhase::Idle;

        if let Err(err) = pulled {
            self.storage.book.remove(caller);
            return Err(err.into());
        }

        let position = slot + 1;
        debug!(account = %caller, position, "joined queue");
        self.storage.events.log(Event::UserRegistered {
            account: caller.clone(),
            position,
        });
        Ok(position)
    }

    /// Leave voluntarily for the partial refund
    ///
    /// Returns the refunded amount.
    pub fn leave<C: CreditPort + ?Sized>(
        &mut self,
        caller: &Account,
        credits: &mut C,
    ) -> Result<Amount, QueueError> {
        self.ensure_ready(credits)?;

        let slot = self
            .storage
            .book
            .remove(caller)
            .ok_or(QueueError::NotQueued)?;

        let refund = self.storage.terms.withdrawal_refund;
        self.pay_out(caller, refund, slot, credits)?;

        debug!(account = %caller, refund, "left queue");
        self.storage.events.log(Event::UserWithdrew {
            account: caller.clone(),
            refund,
        });
        Ok(refund)
    }

    /// Remove the head of the queue with a full refund (custodian only)
    ///
    /// Returns the evicted account.
    pub fn evict<C: CreditPort + ?Sized>(
        &mut self,
        caller: &Account,
        credits: &mut C,
    ) -> Result<Account, QueueError> {
        self.ensure_ready(credits)?;
        self.ensure_custodian(caller)?;

        let head = self
            .storage
            .book
            .head()
            .cloned()
            .ok_or(QueueError::Empty)?;
        let slot = self
            .storage
            .book
            .remove(&head)
            .ok_or(QueueError::Empty)?;

        let refund = self.storage.terms.registration_cost;
        self.pay_out(&head, refund, slot, credits)?;

        debug!(account = %head, refund, "evicted queue head");
        self.storage.events.log(Event::UserRemoved {
            account: head.clone(),
        });
        Ok(head)
    }

    /// Send `amount` from the holding to `account`, which has already been
    /// removed from `slot`. Puts the account back if the transfer fails.
    fn pay_out<C: CreditPort + ?Sized>(
        &mut self,
        account: &Account,
        amount: Amount,
        slot: usize,
        credits: &mut C,
    ) -> Result<(), QueueError> {
        self.phase = CallPhase::EffectsApplied;
        let paid = credits.transfer(
            &self.storage.address,
            account,
            amount,
            MembershipView::new(&self.storage.book, self.phase),
        );
        self.phase = CallPhase::Idle;

        if let Err(err) = paid {
            self.storage.book.insert_at(slot, account.clone());
            return Err(err.into());
        }
        Ok(())
    }

    fn ensure_ready<C: CreditPort + ?Sized>(&self, credits: &C) -> Result<(), QueueError> {
        if self.phase != CallPhase::Idle {
            return Err(QueueError::Reentrant);
        }
        let ledger = self
            .storage
            .ledger
            .as_ref()
            .ok_or(QueueError::NotInitialized)?;
        if credits.address() != ledger {
            return Err(QueueError::LedgerMismatch {
                expected: ledger.clone(),
                actual: credits.address().clone(),
            });
        }
        Ok(())
    }

    fn ensure_custodian(&self, caller: &Account) -> Result<(), QueueError> {
        match &self.storage.custodian {
            Some(custodian) if custodian.is(caller) => Ok(()),
            Some(_) => {
                warn!(%caller, "rejected privileged queue call");
                Err(QueueError::NotCustodian {
                    caller: caller.clone(),
                })
            }
            None => Err(QueueError::NotInitialized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::{CreditLedger, TokenMetadata};

    const COST: Amount = 10;
    const REFUND: Amount = 5;

    fn terms() -> QueueTerms {
        QueueTerms {
            registration_cost: COST,
            withdrawal_refund: REFUND,
        }
    }

    fn setup(users: &[&str]) -> (QueueLedger, CreditLedger, Account) {
        let owner = Account::new("0x0wner");
        let mut ledger = CreditLedger::new(TokenMetadata::default());
        ledger.set_issuer(&owner, owner.clone()).unwrap();

        let mut queue = QueueLedger::deploy(Account::new("0x9ue"), terms());
        queue.initialize(&owner, ledger.address()).unwrap();

        for id in users {
            let user = Account::new(*id);
            ledger.mint(&owner, &user, COST).unwrap();
            ledger.approve(&user, queue.address(), COST).unwrap();
        }
        (queue, ledger, owner)
    }

    #[test]
    fn test_uninitialized_queue_rejects_join() {
        let mut ledger = CreditLedger::new(TokenMetadata::default());
        let mut queue = QueueLedger::deploy(Account::new("0x9ue"), terms());

        let err = queue.join(&Account::new("0xa"), &mut ledger).unwrap_err();
        assert_eq!(err, QueueError::NotInitialized);
    }

    #[test]
    fn test_join_rolls_back_when_transfer_fails() {
        let (mut queue, mut ledger, owner) = setup(&[]);
        let user = Account::new("0xa");
        ledger.mint(&owner, &user, COST).unwrap();
        // Balance is enough but no allowance was granted

        let err = queue.join(&user, &mut ledger).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(matches!(
            err,
            QueueError::Credit(LedgerError::InsufficientAllowance { .. })
        ));
        assert!(!queue.is_in_queue(&user));
        assert_eq!(queue.queue_length(), 0);
        assert!(queue.is_consistent());
    }

    #[test]
    fn test_leave_rolls_back_to_original_slot_when_refund_fails() {
        let (mut queue, mut ledger, _) = setup(&["0xa", "0xb", "0xc"]);
        for id in ["0xa", "0xb", "0xc"] {
            queue.join(&Account::new(id), &mut ledger).unwrap();
        }
        // Drain the holding so the refund cannot be paid
        let holding = queue.address().clone();
        let sink = Account::new("0x5ink");
        let held = ledger.balance_of(&holding);
        ledger.transfer(&holding, &sink, held).unwrap();

        let err = queue.leave(&Account::new("0xb"), &mut ledger).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(queue.position_of(&Account::new("0xb")).unwrap(), 2);
        assert_eq!(queue.position_of(&Account::new("0xc")).unwrap(), 3);
        assert!(queue.is_consistent());
        assert!(queue.events().events_of_type("UserWithdrew").is_empty());
    }

    #[test]
    fn test_evict_checks_authorization_before_emptiness() {
        let (mut queue, mut ledger, _) = setup(&[]);

        let err = queue.evict(&Account::new("0xa"), &mut ledger).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_second_initialize_rejected() {
        let (mut queue, ledger, owner) = setup(&[]);

        let err = queue.initialize(&owner, ledger.address()).unwrap_err();
        assert_eq!(err, QueueError::InvalidInitialization);
        assert_eq!(queue.custodian(), Some(&owner));
    }

    #[test]
    fn test_attach_rejects_uninitialized_storage() {
        let storage = QueueStorage::new(Account::new("0x9ue"), terms());
        assert_eq!(
            QueueLedger::attach(storage).unwrap_err(),
            QueueError::NotInitialized
        );
    }

    #[test]
    fn test_attach_rejects_other_layout() {
        let (queue, _, _) = setup(&[]);
        let mut storage = queue.into_storage();
        storage.layout_version = STORAGE_LAYOUT_VERSION + 1;

        assert!(matches!(
            QueueLedger::attach(storage),
            Err(QueueError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_port_rejected() {
        let (mut queue, _, _) = setup(&[]);
        let mut other = CreditLedger::new(TokenMetadata::default());

        let err = queue.join(&Account::new("0xa"), &mut other).unwrap_err();
        assert!(matches!(err, QueueError::LedgerMismatch { .. }));
    }
}
