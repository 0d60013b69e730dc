//! Orchestrator - deployment wiring and checkpointing
//!
//! See `engine.rs` for the deployed `Waitlist` and `checkpoint.rs` for
//! save/restore.

pub mod checkpoint;
pub mod engine;

// Re-export main types for convenience
pub use engine::{Waitlist, WaitlistConfig, WaitlistError};

// Re-export checkpoint types
pub use checkpoint::{compute_config_hash, validate_snapshot, WaitlistSnapshot};
