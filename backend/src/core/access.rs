//! Privileged roles as capabilities
//!
//! A `Custodian` is appointed exactly once, when the owning component is
//! constructed or initialized. There is no setter: the only way to change
//! the custodian is to build a different component.

use super::account::Account;
use serde::{Deserialize, Serialize};

/// Capability naming the account allowed to perform privileged operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Custodian(Account);

impl Custodian {
    pub(crate) fn appoint(account: Account) -> Self {
        Self(account)
    }

    pub fn account(&self) -> &Account {
        &self.0
    }

    /// Whether `caller` holds this capability.
    pub fn is(&self, caller: &Account) -> bool {
        &self.0 == caller
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custodian_matches_only_appointed_account() {
        let custodian = Custodian::appoint(Account::new("0xowner"));

        assert!(custodian.is(&Account::new("0xowner")));
        assert!(!custodian.is(&Account::new("0xuser")));
    }
}
