//! Queue Book - ordered membership with a position index
//!
//! The book is the queue's aggregate: a dense sequence of accounts in
//! service order plus a map from account to its slot in that sequence.
//!
//! # Invariants
//!
//! 1. For every `(account, i)` in the index, `order[i] == account`
//! 2. Every entry of `order` has an index entry (sizes are equal)
//! 3. No account appears twice
//!
//! # Removal
//!
//! Removing an entry shifts every later entry one slot toward the front and
//! re-indexes the shifted accounts: O(entries after the removal point).
//! Swap-with-last would be O(1) but reorders the tail, and service order is
//! the whole point of the queue.

use crate::core::account::Account;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBook {
    /// Accounts in service order (index 0 = head)
    order: Vec<Account>,

    /// Account → slot in `order`
    index: BTreeMap<Account, usize>,
}

impl QueueBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from an ordered member list
    ///
    /// Returns `None` if the list contains a duplicate.
    pub fn rebuild(order: Vec<Account>) -> Option<Self> {
        let mut index = BTreeMap::new();
        for (i, account) in order.iter().enumerate() {
            if index.insert(account.clone(), i).is_some() {
                return None;
            }
        }
        Some(Self { order, index })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, account: &Account) -> bool {
        self.index.contains_key(account)
    }

    /// 0-based slot of `account`
    pub fn slot_of(&self, account: &Account) -> Option<usize> {
        self.index.get(account).copied()
    }

    /// Account at `slot`
    pub fn at(&self, slot: usize) -> Option<&Account> {
        self.order.get(slot)
    }

    /// Account at slot 0
    pub fn head(&self) -> Option<&Account> {
        self.order.first()
    }

    /// Members in service order
    pub fn members(&self) -> &[Account] {
        &self.order
    }

    /// Append `account` to the tail, returning its slot
    ///
    /// Returns `None` (and changes nothing) if the account is already present.
    pub fn push(&mut self, account: Account) -> Option<usize> {
        if self.index.contains_key(&account) {
            return None;
        }
        let slot = self.order.len();
        self.index.insert(account.clone(), slot);
        self.order.push(account);
        Some(slot)
    }

    /// Remove `account`, compacting the tail toward the front
    ///
    /// Returns the slot the account occupied.
    pub fn remove(&mut self, account: &Account) -> Option<usize> {
        let slot = self.index.remove(account)?;
        self.order.remove(slot);
        self.reindex_from(slot);
        Some(slot)
    }

    /// Put `account` back at `slot`, shifting the tail toward the back
    ///
    /// Inverse of `remove`; used to roll back a removal whose refund failed.
    pub(crate) fn insert_at(&mut self, slot: usize, account: Account) {
        let slot = slot.min(self.order.len());
        self.order.insert(slot, account);
        self.reindex_from(slot);
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, account) in self.order.iter().enumerate().skip(start) {
            self.index.insert(account.clone(), i);
        }
    }

    /// Check order and index agree with each other
    pub fn is_consistent(&self) -> bool {
        self.order.len() == self.index.len()
            && self
                .order
                .iter()
                .enumerate()
                .all(|(i, account)| self.index.get(account) == Some(&i))
    }
}
