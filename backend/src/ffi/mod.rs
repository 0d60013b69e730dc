//! FFI module for Python integration via PyO3
//!
//! The boundary takes and returns plain values (strings, integers, JSON
//! text). Every Rust error becomes a Python exception whose message starts
//! with its error class.

pub mod waitlist;

pub use waitlist::PyWaitlist;
