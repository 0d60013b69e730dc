//! Checkpoint - Save/Load Waitlist State
//!
//! Serializes the complete state of a deployed waitlist so it can be
//! persisted and restored later.
//!
//! # Critical Invariants
//!
//! - **Supply Conservation**: balances in the snapshot sum to total supply
//! - **Queue Integrity**: no duplicate members, order and index agree
//! - **Wiring**: issuer and queue both reference the snapshot's ledger, and
//!   the ledger's minter is the snapshot's issuer
//! - **Config Matching**: state can only be loaded with matching config

use crate::core::account::{Account, Amount};
use crate::issuer::CreditIssuer;
use crate::models::ledger::CreditLedger;
use crate::orchestrator::engine::{Waitlist, WaitlistConfig, WaitlistError};
use crate::queue::{QueueLedger, QueueStorage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::info;

// ============================================================================
// Snapshot Structure
// ============================================================================

/// Complete waitlist state snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistSnapshot {
    /// Configuration the waitlist was deployed with
    pub config: WaitlistConfig,

    /// SHA256 hash of `config` (for validation)
    pub config_hash: String,

    pub deployer: Account,

    pub ledger: CreditLedger,

    pub issuer: CreditIssuer,

    /// Queue storage as persisted between logic versions
    pub queue: QueueStorage,
}

impl WaitlistSnapshot {
    pub fn to_json(&self) -> Result<String, WaitlistError> {
        serde_json::to_string(self)
            .map_err(|e| WaitlistError::Serialization(format!("Snapshot encode failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, WaitlistError> {
        serde_json::from_str(json)
            .map_err(|e| WaitlistError::Serialization(format!("Snapshot decode failed: {}", e)))
    }
}

impl Waitlist {
    /// Capture the complete current state
    pub fn snapshot(&self) -> WaitlistSnapshot {
        WaitlistSnapshot {
            config: self.config().clone(),
            config_hash: self.config_hash().to_string(),
            deployer: self.deployer().clone(),
            ledger: self.ledger().clone(),
            issuer: self.issuer().clone(),
            queue: self.queue().storage().clone(),
        }
    }

    /// Rebuild a waitlist from a snapshot taken under `config`
    pub fn restore(
        snapshot: WaitlistSnapshot,
        config: &WaitlistConfig,
    ) -> Result<Self, WaitlistError> {
        let found = compute_config_hash(config)?;
        if found != snapshot.config_hash {
            return Err(WaitlistError::ConfigMismatch {
                expected: snapshot.config_hash,
                found,
            });
        }
        validate_snapshot(&snapshot)?;

        let queue = QueueLedger::attach(snapshot.queue)?;
        info!(
            ledger = %snapshot.ledger.address(),
            members = queue.queue_length(),
            "waitlist restored"
        );

        Ok(Waitlist::from_parts(
            snapshot.config,
            snapshot.config_hash,
            snapshot.deployer,
            snapshot.ledger,
            snapshot.issuer,
            queue,
        ))
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, WaitlistError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| WaitlistError::Serialization(format!("Config serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| WaitlistError::Serialization(format!("Config serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate snapshot integrity
///
/// Checks:
/// - Embedded config is valid and matches its hash
/// - Supply conservation
/// - Queue uniqueness and order/index agreement
/// - Queue holding covers a full refund per member
/// - Issuer and queue reference the snapshot's ledger, and the ledger's
///   minter is the snapshot's issuer
/// - Queue terms, issuer pricing and token metadata agree with the config
pub fn validate_snapshot(snapshot: &WaitlistSnapshot) -> Result<(), WaitlistError> {
    // 0. Config integrity
    let found = compute_config_hash(&snapshot.config)?;
    if found != snapshot.config_hash {
        return Err(WaitlistError::ConfigMismatch {
            expected: snapshot.config_hash.clone(),
            found,
        });
    }
    snapshot.config.validate()?;

    // 1. Supply conservation
    if !snapshot.ledger.supply_is_conserved() {
        return Err(WaitlistError::StateValidation(format!(
            "Supply conservation violated: total supply {}",
            snapshot.ledger.total_supply()
        )));
    }

    // 2. Queue uniqueness
    let book = snapshot.queue.book();
    let mut seen = BTreeSet::new();
    for account in book.members() {
        if !seen.insert(account) {
            return Err(WaitlistError::StateValidation(format!(
                "Duplicate queue member: {}",
                account
            )));
        }
    }
    if !book.is_consistent() {
        return Err(WaitlistError::StateValidation(
            "Queue order and index disagree".to_string(),
        ));
    }

    // 3. Holding solvency
    let owed = (book.len() as Amount)
        .checked_mul(snapshot.queue.terms().registration_cost)
        .ok_or_else(|| {
            WaitlistError::StateValidation("Queue liability overflows".to_string())
        })?;
    let held = snapshot.ledger.balance_of(snapshot.queue.address());
    if held < owed {
        return Err(WaitlistError::StateValidation(format!(
            "Queue holding {} below liability {}",
            held, owed
        )));
    }

    // 4. Wiring
    let ledger = snapshot.ledger.address();
    if snapshot.issuer.ledger() != ledger {
        return Err(WaitlistError::StateValidation(format!(
            "Issuer bound to {}, snapshot ledger is {}",
            snapshot.issuer.ledger(),
            ledger
        )));
    }
    if snapshot.queue.ledger() != Some(ledger) {
        return Err(WaitlistError::StateValidation(format!(
            "Queue not bound to snapshot ledger {}",
            ledger
        )));
    }
    if snapshot.ledger.issuer() != Some(snapshot.issuer.address()) {
        return Err(WaitlistError::StateValidation(format!(
            "Ledger minter is not the snapshot issuer {}",
            snapshot.issuer.address()
        )));
    }

    // 5. Component state agrees with config
    let config = &snapshot.config;
    if snapshot.queue.terms() != &config.queue_terms() {
        return Err(WaitlistError::StateValidation(format!(
            "Queue terms {:?} differ from config",
            snapshot.queue.terms()
        )));
    }
    if snapshot.issuer.unit_price() != config.unit_price
        || snapshot.issuer.base_issuance() != config.base_issuance
    {
        return Err(WaitlistError::StateValidation(format!(
            "Issuer pricing (price {}, base {}) differs from config",
            snapshot.issuer.unit_price(),
            snapshot.issuer.base_issuance()
        )));
    }
    if snapshot.ledger.name() != config.token.name
        || snapshot.ledger.symbol() != config.token.symbol
        || snapshot.ledger.decimals() != config.token.decimals
    {
        return Err(WaitlistError::StateValidation(
            "Ledger token metadata differs from config".to_string(),
        ));
    }

    Ok(())
}
