//! Domain models: the credit ledger, the queue book and the event log

pub mod event;
pub mod ledger;
pub mod queue_book;

// Re-exports
pub use event::{Event, EventLog, EventRecord};
pub use ledger::{CreditLedger, LedgerError, TokenMetadata};
pub use queue_book::QueueBook;
