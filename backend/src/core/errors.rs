//! Error taxonomy
//!
//! Every component error maps onto one of these classes so callers can
//! branch on the class without matching each concrete variant.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller lacks the required role
    Authorization,
    /// Operation invalid for the current state
    State,
    /// Null or zero arguments, out-of-range indices, overflow
    Input,
    /// Balance or allowance below the required amount
    InsufficientFunds,
    /// Payment differs from the fixed unit price
    ExactPayment,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::State => "StateError",
            ErrorKind::Input => "InputError",
            ErrorKind::InsufficientFunds => "InsufficientFundsError",
            ErrorKind::ExactPayment => "ExactPaymentError",
        };
        f.write_str(name)
    }
}
