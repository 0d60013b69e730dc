//! Queue Ledger and the credit port it pays through

pub mod ledger;
pub mod port;

pub use ledger::{
    QueueError, QueueLedger, QueueStorage, QueueTerms, STORAGE_LAYOUT_VERSION, VERSION,
};
pub use port::{CallPhase, CreditPort, MembershipView};
