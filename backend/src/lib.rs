//! Waitlist Core - Rust Engine
//!
//! Credit-funded first-come-first-served queue.
//!
//! # Architecture
//!
//! - **core**: Accounts, amounts, custodian capability, error taxonomy
//! - **models**: Credit ledger, queue book, event log
//! - **issuer**: Sells credits with a balance-dependent bonus
//! - **queue**: Queue ledger and the credit port it pays through
//! - **orchestrator**: Deployment wiring, configuration, checkpointing
//!
//! # Critical Invariants
//!
//! 1. All credit amounts are u128 base units (18 decimals)
//! 2. Sum of balances == total supply
//! 3. Queue order and position index agree after every call
//! 4. A failed call leaves every component unchanged

// Module declarations
pub mod core;
pub mod issuer;
pub mod models;
pub mod orchestrator;
pub mod queue;

// Re-exports for convenience
pub use core::account::{tokens, Account, Amount, WAD, ZERO_ADDRESS};
pub use core::errors::ErrorKind;
pub use issuer::{CreditIssuer, IssuerError, Payout};
pub use models::{
    event::{Event, EventLog, EventRecord},
    ledger::{CreditLedger, LedgerError, TokenMetadata},
    queue_book::QueueBook,
};
pub use orchestrator::{
    compute_config_hash, validate_snapshot, Waitlist, WaitlistConfig, WaitlistError,
    WaitlistSnapshot,
};
pub use queue::{
    CallPhase, CreditPort, MembershipView, QueueError, QueueLedger, QueueStorage, QueueTerms,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn waitlist_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::waitlist::PyWaitlist>()?;
    Ok(())
}
