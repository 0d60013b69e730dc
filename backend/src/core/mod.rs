//! Core primitives shared by every component
//!
//! - **account**: opaque account identities and credit amounts
//! - **access**: one-time capabilities for privileged roles
//! - **errors**: the error taxonomy every component error maps into

pub mod access;
pub mod account;
pub mod errors;
