//! Waitlist Engine
//!
//! Owns one instance of each component and wires them together:
//!
//! ```text
//! deploy(config, deployer):
//! 1. Deploy CreditLedger (token metadata from config)
//! 2. Deploy CreditIssuer (custodian = deployer, bound to the ledger)
//! 3. CreditLedger.set_issuer(issuer)
//! 4. Deploy QueueLedger and initialize it (custodian = deployer)
//! ```
//!
//! After deployment every operation names its caller explicitly and is
//! routed to the component that owns it. Calls run one at a time and either
//! complete or leave every component unchanged.
//!
//! # Example
//!
//! ```rust
//! use waitlist_core_rs::{Account, Waitlist, WaitlistConfig};
//!
//! let deployer = Account::new("0xdep10yer");
//! let alice = Account::new("0xa11ce");
//! let config = WaitlistConfig::default();
//! let price = config.unit_price;
//! let cost = config.registration_cost;
//!
//! let mut waitlist = Waitlist::deploy(config, deployer.clone()).unwrap();
//!
//! waitlist.buy(&alice, price).unwrap();
//! waitlist.approve_queue(&alice, cost).unwrap();
//! assert_eq!(waitlist.join(&alice).unwrap(), 1);
//!
//! let evicted = waitlist.evict(&deployer).unwrap();
//! assert_eq!(evicted, alice);
//! assert_eq!(waitlist.balance_of(&alice), cost);
//! ```

use crate::core::account::{tokens, Account, Amount, WAD};
use crate::core::errors::ErrorKind;
use crate::issuer::{CreditIssuer, IssuerError, Payout};
use crate::models::ledger::{CreditLedger, LedgerError, TokenMetadata};
use crate::orchestrator::checkpoint::compute_config_hash;
use crate::queue::{QueueError, QueueLedger, QueueStorage, QueueTerms};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete deployment configuration
///
/// All amounts are in base units (18 decimals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitlistConfig {
    /// Credit token metadata
    pub token: TokenMetadata,

    /// Credits pulled on join and refunded in full on evict
    pub registration_cost: Amount,

    /// Credits refunded on voluntary leave (must be below the cost)
    pub withdrawal_refund: Amount,

    /// Exact payment accepted per purchase
    pub unit_price: Amount,

    /// Credits minted per purchase before the balance bonus
    pub base_issuance: Amount,
}

impl Default for WaitlistConfig {
    fn default() -> Self {
        Self {
            token: TokenMetadata::default(),
            registration_cost: tokens(1),
            withdrawal_refund: WAD / 2,
            unit_price: WAD / 100,
            base_issuance: tokens(1),
        }
    }
}

impl WaitlistConfig {
    /// Parse a config from JSON; omitted fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, WaitlistError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WaitlistError::InvalidConfig(format!("Config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WaitlistError> {
        if self.registration_cost == 0 {
            return Err(WaitlistError::InvalidConfig(
                "registration_cost must be greater than zero".to_string(),
            ));
        }
        if self.withdrawal_refund >= self.registration_cost {
            return Err(WaitlistError::InvalidConfig(format!(
                "withdrawal_refund ({}) must be below registration_cost ({})",
                self.withdrawal_refund, self.registration_cost
            )));
        }
        if self.unit_price == 0 {
            return Err(WaitlistError::InvalidConfig(
                "unit_price must be greater than zero".to_string(),
            ));
        }
        if self.base_issuance == 0 {
            return Err(WaitlistError::InvalidConfig(
                "base_issuance must be greater than zero".to_string(),
            ));
        }
        if self.token.name.is_empty() || self.token.symbol.is_empty() {
            return Err(WaitlistError::InvalidConfig(
                "token name and symbol must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn queue_terms(&self) -> QueueTerms {
        QueueTerms {
            registration_cost: self.registration_cost,
            withdrawal_refund: self.withdrawal_refund,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the waitlist engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitlistError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Issuer(#[from] IssuerError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State validation error: {0}")]
    StateValidation(String),

    #[error("Config mismatch: snapshot has {expected}, config hashes to {found}")]
    ConfigMismatch { expected: String, found: String },
}

impl WaitlistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaitlistError::Ledger(e) => e.kind(),
            WaitlistError::Issuer(e) => e.kind(),
            WaitlistError::Queue(e) => e.kind(),
            WaitlistError::InvalidConfig(_)
            | WaitlistError::Serialization(_)
            | WaitlistError::ConfigMismatch { .. } => ErrorKind::Input,
            WaitlistError::StateValidation(_) => ErrorKind::State,
        }
    }
}

// ============================================================================
// Waitlist
// ============================================================================

/// A deployed waitlist: ledger, issuer and queue wired together
#[derive(Debug, Clone)]
pub struct Waitlist {
    config: WaitlistConfig,
    config_hash: String,
    deployer: Account,
    ledger: CreditLedger,
    issuer: CreditIssuer,
    queue: QueueLedger,
}

impl Waitlist {
    /// Deploy and wire all three components
    ///
    /// `deployer` becomes custodian of both the issuer and the queue.
    pub fn deploy(config: WaitlistConfig, deployer: Account) -> Result<Self, WaitlistError> {
        config.validate()?;
        if deployer.is_null() {
            return Err(WaitlistError::InvalidConfig(
                "deployer must not be the null account".to_string(),
            ));
        }
        let config_hash = compute_config_hash(&config)?;

        let mut ledger = CreditLedger::new(config.token.clone());
        let issuer = CreditIssuer::new(
            deployer.clone(),
            ledger.address().clone(),
            config.unit_price,
            config.base_issuance,
        )?;
        ledger.set_issuer(&deployer, issuer.address().clone())?;

        let mut queue = QueueLedger::deploy(Account::generate(), config.queue_terms());
        queue.initialize(&deployer, ledger.address())?;

        info!(
            %deployer,
            ledger = %ledger.address(),
            issuer = %issuer.address(),
            queue = %queue.address(),
            "waitlist deployed"
        );

        Ok(Self {
            config,
            config_hash,
            deployer,
            ledger,
            issuer,
            queue,
        })
    }

    pub(crate) fn from_parts(
        config: WaitlistConfig,
        config_hash: String,
        deployer: Account,
        ledger: CreditLedger,
        issuer: CreditIssuer,
        queue: QueueLedger,
    ) -> Self {
        Self {
            config,
            config_hash,
            deployer,
            ledger,
            issuer,
            queue,
        }
    }

    // ========================================================================
    // Component access
    // ========================================================================

    pub fn config(&self) -> &WaitlistConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn deployer(&self) -> &Account {
        &self.deployer
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn issuer(&self) -> &CreditIssuer {
        &self.issuer
    }

    pub fn queue(&self) -> &QueueLedger {
        &self.queue
    }

    // ========================================================================
    // Credit ledger
    // ========================================================================

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn set_issuer(&mut self, caller: &Account, issuer: Account) -> Result<(), WaitlistError> {
        Ok(self.ledger.set_issuer(caller, issuer)?)
    }

    pub fn mint(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), WaitlistError> {
        Ok(self.ledger.mint(caller, to, amount)?)
    }

    pub fn transfer(
        &mut self,
        caller: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), WaitlistError> {
        Ok(self.ledger.transfer(caller, to, amount)?)
    }

    pub fn approve(
        &mut self,
        owner: &Account,
        spender: &Account,
        amount: Amount,
    ) -> Result<(), WaitlistError> {
        Ok(self.ledger.approve(owner, spender, amount)?)
    }

    /// Approve the queue to pull `amount` from `owner`
    pub fn approve_queue(&mut self, owner: &Account, amount: Amount) -> Result<(), WaitlistError> {
        let queue = self.queue.address().clone();
        Ok(self.ledger.approve(owner, &queue, amount)?)
    }

    pub fn transfer_from(
        &mut self,
        spender: &Account,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), WaitlistError> {
        Ok(self.ledger.transfer_from(spender, from, to, amount)?)
    }

    // ========================================================================
    // Credit issuer
    // ========================================================================

    /// Buy credits for exactly the unit price; returns the amount minted
    pub fn buy(&mut self, caller: &Account, payment: Amount) -> Result<Amount, WaitlistError> {
        Ok(self.issuer.buy(caller, payment, &mut self.ledger)?)
    }

    /// Credits the next purchase by `buyer` would mint
    pub fn quote(&self, buyer: &Account) -> Result<Amount, WaitlistError> {
        Ok(self.issuer.quote(buyer, &self.ledger)?)
    }

    pub fn collected(&self) -> Amount {
        self.issuer.collected()
    }

    pub fn withdraw_funds(&mut self, caller: &Account) -> Result<Payout, WaitlistError> {
        Ok(self.issuer.withdraw(caller)?)
    }

    // ========================================================================
    // Queue ledger
    // ========================================================================

    /// Join the queue; returns the 1-indexed position
    pub fn join(&mut self, caller: &Account) -> Result<usize, WaitlistError> {
        Ok(self.queue.join(caller, &mut self.ledger)?)
    }

    /// Leave the queue; returns the refund
    pub fn leave(&mut self, caller: &Account) -> Result<Amount, WaitlistError> {
        Ok(self.queue.leave(caller, &mut self.ledger)?)
    }

    /// Evict the head (custodian only); returns the evicted account
    pub fn evict(&mut self, caller: &Account) -> Result<Account, WaitlistError> {
        Ok(self.queue.evict(caller, &mut self.ledger)?)
    }

    pub fn is_in_queue(&self, account: &Account) -> bool {
        self.queue.is_in_queue(account)
    }

    pub fn queue_length(&self) -> usize {
        self.queue.queue_length()
    }

    pub fn queue_at(&self, index: usize) -> Result<&Account, WaitlistError> {
        Ok(self.queue.queue_at(index)?)
    }

    pub fn position_of(&self, caller: &Account) -> Result<usize, WaitlistError> {
        Ok(self.queue.position_of(caller)?)
    }

    pub fn members(&self) -> &[Account] {
        self.queue.members()
    }

    /// Replace the queue logic over its existing storage (custodian only)
    ///
    /// Storage is encoded and decoded through the persisted layout, then
    /// re-attached without running initialization again.
    pub fn upgrade_queue(&mut self, caller: &Account) -> Result<(), WaitlistError> {
        if let Err(err) = self.queue.authorize_upgrade(caller) {
            warn!(%caller, "rejected queue upgrade");
            return Err(err.into());
        }

        let encoded = serde_json::to_string(self.queue.storage()).map_err(|e| {
            WaitlistError::Serialization(format!("Queue storage encode failed: {}", e))
        })?;
        let storage: QueueStorage = serde_json::from_str(&encoded).map_err(|e| {
            WaitlistError::Serialization(format!("Queue storage decode failed: {}", e))
        })?;

        let mut upgraded = QueueLedger::attach(storage)?;
        upgraded.record_upgrade();
        self.queue = upgraded;

        info!(%caller, version = self.queue.version(), "queue logic upgraded");
        Ok(())
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Check the cross-component invariants
    ///
    /// - Sum of balances equals total supply
    /// - Queue order and index agree
    /// - The queue's holding covers a full refund for every member
    pub fn check_invariants(&self) -> Result<(), WaitlistError> {
        if !self.ledger.supply_is_conserved() {
            return Err(WaitlistError::StateValidation(format!(
                "Supply conservation violated: total supply {}",
                self.ledger.total_supply()
            )));
        }
        if !self.queue.is_consistent() {
            return Err(WaitlistError::StateValidation(
                "Queue order and index disagree".to_string(),
            ));
        }

        let owed = (self.queue.queue_length() as Amount)
            .checked_mul(self.queue.registration_cost())
            .ok_or_else(|| {
                WaitlistError::StateValidation("Queue liability overflows".to_string())
            })?;
        let held = self.ledger.balance_of(self.queue.address());
        if held < owed {
            return Err(WaitlistError::StateValidation(format!(
                "Queue holding {} below liability {}",
                held, owed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployer() -> Account {
        Account::new("0xdep10yer")
    }

    #[test]
    fn test_default_config_uses_token_constants() {
        let config = WaitlistConfig::default();

        assert_eq!(config.registration_cost, 1_000_000_000_000_000_000);
        assert_eq!(config.withdrawal_refund, 500_000_000_000_000_000);
        assert_eq!(config.unit_price, 10_000_000_000_000_000);
        assert_eq!(config.base_issuance, 1_000_000_000_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_refund_not_below_cost() {
        let config = WaitlistConfig {
            withdrawal_refund: tokens(1),
            ..WaitlistConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, WaitlistError::InvalidConfig(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = WaitlistConfig::from_json_str(r#"{"unit_price": 5}"#).unwrap();

        assert_eq!(config.unit_price, 5);
        assert_eq!(config.registration_cost, tokens(1));
        assert_eq!(config.token.symbol, "WAIT");
    }

    #[test]
    fn test_config_from_bad_json_is_invalid_config() {
        let err = WaitlistConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, WaitlistError::InvalidConfig(_)));
    }

    #[test]
    fn test_deploy_wires_components() {
        let waitlist = Waitlist::deploy(WaitlistConfig::default(), deployer()).unwrap();

        assert_eq!(waitlist.ledger().issuer(), Some(waitlist.issuer().address()));
        assert_eq!(waitlist.issuer().ledger(), waitlist.ledger().address());
        assert_eq!(waitlist.queue().ledger(), Some(waitlist.ledger().address()));
        assert_eq!(waitlist.queue().custodian(), Some(&deployer()));
        assert_eq!(waitlist.issuer().custodian(), &deployer());
        assert!(waitlist.check_invariants().is_ok());
    }

    #[test]
    fn test_deploy_rejects_null_deployer() {
        let err = Waitlist::deploy(WaitlistConfig::default(), Account::null()).unwrap_err();
        assert!(matches!(err, WaitlistError::InvalidConfig(_)));
    }

    #[test]
    fn test_upgrade_requires_custodian() {
        let mut waitlist = Waitlist::deploy(WaitlistConfig::default(), deployer()).unwrap();

        let err = waitlist.upgrade_queue(&Account::new("0xmallory")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(waitlist.queue().events().events_of_type("Upgraded").is_empty());
    }
}
