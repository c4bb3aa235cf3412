//! The module contains the errors the engine can return.
//!
//! Every variant maps to one class of failure callers must tell apart:
//!
//! - [`Validation`] bad or missing input, detected before any write.
//! - [`Unauthenticated`] / [`Forbidden`] identity and moderator checks.
//! - [`KeyNotFound`] a referenced pool or user does not exist.
//! - [`Conflict`] a pool still referenced by allocations.
//! - [`SecurityMismatch`] captured amount disagrees with the declared allocations.
//! - [`InsufficientFunds`] a withdrawal exceeds a pool balance.
//! - [`Upstream`] the identity provider or payment processor failed.
//! - [`Database`] the durable store failed.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Unauthenticated`]: EngineError::Unauthenticated
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Conflict`]: EngineError::Conflict
//!  [`SecurityMismatch`]: EngineError::SecurityMismatch
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`Upstream`]: EngineError::Upstream
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::MoneyCents;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    KeyNotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("captured amount {captured} does not match declared allocations {declared}")]
    SecurityMismatch {
        captured: MoneyCents,
        declared: MoneyCents,
    },
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Unauthenticated, Self::Unauthenticated) => true,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (
                Self::SecurityMismatch {
                    captured: c1,
                    declared: d1,
                },
                Self::SecurityMismatch {
                    captured: c2,
                    declared: d2,
                },
            ) => c1 == c2 && d1 == d2,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Upstream(a), Self::Upstream(b)) => a == b,
            (Self::Config(a), Self::Config(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
