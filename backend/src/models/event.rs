//! Event logging for state-change notifications.
//!
//! Every component owns an append-only `EventLog`. External collaborators
//! (display layers, indexers) never read component storage directly; they
//! poll the logs with a cursor and react to what they see.
//!
//! # Event Types
//!
//! - **Ledger**: `Transfer`, `Approval`, `IssuerSet`
//! - **Issuer**: `TokenPurchased`, `FundsWithdrawn`
//! - **Queue**: `UserRegistered`, `UserWithdrew`, `UserRemoved`,
//!   `Initialized`, `Upgraded`
//!
//! An event is only logged once the call that produced it has succeeded, so
//! a failed call never leaves a trace in any log.
//!
//! # Example
//!
//! ```rust
//! use waitlist_core_rs::{Account, Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::UserRegistered {
//!     account: Account::new("0xa11ce"),
//!     position: 1,
//! });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.since(0)[0].event.event_type(), "UserRegistered");
//! ```

use crate::core::account::{Account, Amount};
use serde::{Deserialize, Serialize};

/// Notification emitted by a successful state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Credits moved; `from` is the null account for mints
    Transfer {
        from: Account,
        to: Account,
        amount: Amount,
    },

    /// Allowance overwritten
    Approval {
        owner: Account,
        spender: Account,
        amount: Amount,
    },

    /// Minter configured (happens once)
    IssuerSet { issuer: Account },

    /// Credits sold; `amount` is what was minted, not the new balance
    TokenPurchased { buyer: Account, amount: Amount },

    /// Accumulated payment paid out to the custodian
    FundsWithdrawn { custodian: Account, amount: Amount },

    /// Account joined the queue at a 1-indexed position
    UserRegistered { account: Account, position: usize },

    /// Account left voluntarily and received the partial refund
    UserWithdrew { account: Account, refund: Amount },

    /// Head of the queue evicted by the custodian (full refund)
    UserRemoved { account: Account },

    /// Queue storage initialized
    Initialized { version: u8 },

    /// Queue logic re-attached to existing storage
    Upgraded { version: String },
}

impl Event {
    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::IssuerSet { .. } => "IssuerSet",
            Event::TokenPurchased { .. } => "TokenPurchased",
            Event::FundsWithdrawn { .. } => "FundsWithdrawn",
            Event::UserRegistered { .. } => "UserRegistered",
            Event::UserWithdrew { .. } => "UserWithdrew",
            Event::UserRemoved { .. } => "UserRemoved",
            Event::Initialized { .. } => "Initialized",
            Event::Upgraded { .. } => "Upgraded",
        }
    }

    /// Whether the event names `account` in any of its fields
    pub fn involves(&self, account: &Account) -> bool {
        match self {
            Event::Transfer { from, to, .. } => from == account || to == account,
            Event::Approval { owner, spender, .. } => owner == account || spender == account,
            Event::IssuerSet { issuer } => issuer == account,
            Event::TokenPurchased { buyer, .. } => buyer == account,
            Event::FundsWithdrawn { custodian, .. } => custodian == account,
            Event::UserRegistered { account: a, .. }
            | Event::UserWithdrew { account: a, .. }
            | Event::UserRemoved { account: a } => a == account,
            Event::Initialized { .. } | Event::Upgraded { .. } => false,
        }
    }
}

/// An event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log.
///
/// Sequence numbers start at 0 and keep increasing even across `clear`, so
/// a cursor held by a collaborator never points at a different event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn log(&mut self, event: Event) -> u64 {
        let seq = self.next_seq;
        self.records.push(EventRecord { seq, event });
        self.next_seq += 1;
        seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence number the next event will receive
    pub fn cursor(&self) -> u64 {
        self.next_seq
    }

    /// All retained records
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq >= cursor`
    pub fn since(&self, cursor: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.seq < cursor);
        &self.records[start..]
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&Event> {
        self.records.last().map(|r| &r.event)
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events naming a specific account
    pub fn events_for_account(&self, account: &Account) -> Vec<&Event> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.involves(account))
            .collect()
    }

    /// Drop retained records (sequence numbering continues)
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(id: &str, position: usize) -> Event {
        Event::UserRegistered {
            account: Account::new(id),
            position,
        }
    }

    #[test]
    fn test_event_type() {
        let event = Event::TokenPurchased {
            buyer: Account::new("0xa"),
            amount: 1,
        };

        assert_eq!(event.event_type(), "TokenPurchased");
    }

    #[test]
    fn test_transfer_involves_both_sides() {
        let event = Event::Transfer {
            from: Account::new("0xa"),
            to: Account::new("0xb"),
            amount: 5,
        };

        assert!(event.involves(&Account::new("0xa")));
        assert!(event.involves(&Account::new("0xb")));
        assert!(!event.involves(&Account::new("0xc")));
    }

    #[test]
    fn test_event_log_assigns_increasing_sequence() {
        let mut log = EventLog::new();

        assert_eq!(log.log(registered("0xa", 1)), 0);
        assert_eq!(log.log(registered("0xb", 2)), 1);
        assert_eq!(log.cursor(), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_since_returns_suffix() {
        let mut log = EventLog::new();
        log.log(registered("0xa", 1));
        log.log(registered("0xb", 2));
        log.log(Event::UserRemoved {
            account: Account::new("0xa"),
        });

        let tail = log.since(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 1);
        assert!(log.since(3).is_empty());
    }

    #[test]
    fn test_event_log_query_by_type_and_account() {
        let mut log = EventLog::new();
        log.log(registered("0xa", 1));
        log.log(registered("0xb", 2));
        log.log(Event::UserWithdrew {
            account: Account::new("0xa"),
            refund: 5,
        });

        assert_eq!(log.events_of_type("UserRegistered").len(), 2);
        assert_eq!(log.events_for_account(&Account::new("0xa")).len(), 2);
    }

    #[test]
    fn test_clear_keeps_sequence_running() {
        let mut log = EventLog::new();
        log.log(registered("0xa", 1));
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.log(registered("0xb", 1)), 1);
        assert_eq!(log.since(0).len(), 1);
    }
}
