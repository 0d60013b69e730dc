//! Account identities and credit amounts
//!
//! Accounts are opaque address-like keys. Components, users and custodians
//! are all addressed the same way. The all-zero address is the *null*
//! account: it can be passed as an argument (and is rejected wherever a
//! real target is required) but never holds a balance.
//!
//! CRITICAL: All credit and payment values are u128 base units (18 decimals)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount of credits or payment currency in base units.
pub type Amount = u128;

/// Base units per whole token (18 decimals).
pub const WAD: Amount = 1_000_000_000_000_000_000;

/// Canonical null address.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Convert a whole-token count to base units.
///
/// # Example
/// ```
/// use waitlist_core_rs::core::account::{tokens, WAD};
///
/// assert_eq!(tokens(3), 3 * WAD);
/// ```
pub const fn tokens(whole: u64) -> Amount {
    whole as Amount * WAD
}

/// Opaque account identity
///
/// # Example
/// ```
/// use waitlist_core_rs::Account;
///
/// let alice = Account::new("0xa11ce");
/// assert!(!alice.is_null());
/// assert!(Account::null().is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The null account.
    pub fn null() -> Self {
        Self(ZERO_ADDRESS.to_string())
    }

    /// Generate a fresh random address (used for component addresses).
    pub fn generate() -> Self {
        Self(format!("0x{}", uuid::Uuid::new_v4().simple()))
    }

    /// True for the zero address and for an empty identifier.
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0 == ZERO_ADDRESS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Account {
    fn from(id: String) -> Self {
        Self(id)
    }
}
