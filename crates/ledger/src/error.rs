//! The module contains the errors the ledger can throw.
//!
//! The credit errors carry the numbers that made the operation fail:
//!
//! - [`InsufficientCredit`] reports the available balance and the requested
//!   amount.
//! - [`CreditLimitExceeded`] reports the limit and the balance the operation
//!   attempted to reach.
//!
//! [`InsufficientCredit`]: LedgerError::InsufficientCredit
//! [`CreditLimitExceeded`]: LedgerError::CreditLimitExceeded
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" not found!")]
    KeyNotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" already present!")]
    Conflict(String),
    #[error("insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit { available: i64, requested: i64 },
    #[error("credit limit exceeded: limit {limit}, attempted {attempted}")]
    CreditLimitExceeded { limit: i64, attempted: i64 },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("consistency error: {0}")]
    Consistency(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (
                Self::InsufficientCredit {
                    available: a1,
                    requested: r1,
                },
                Self::InsufficientCredit {
                    available: a2,
                    requested: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (
                Self::CreditLimitExceeded {
                    limit: l1,
                    attempted: t1,
                },
                Self::CreditLimitExceeded {
                    limit: l2,
                    attempted: t2,
                },
            ) => l1 == l2 && t1 == t2,
            (Self::InvalidOperation(a), Self::InvalidOperation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Consistency(a), Self::Consistency(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
