//! Donation ledger engine.
//!
//! Funding pools hold no stored balance: every amount shown to a user is
//! derived from `ledger` and `allocation` rows. All writes go through one
//! recorder that creates a ledger entry and its allocations atomically.

pub use allocations::Allocation;
pub use commands::{
    AllocationRequest, CaptureDonationCmd, ExternalDonationCmd, PoolCmd, WithdrawalCmd,
};
pub use error::EngineError;
pub use funding_pools::FundingPool;
pub use identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
pub use ledger::{Ledger, LedgerEntry, LedgerTotals, TransactionKind};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use payments::{
    CAPTURE_STATUS_COMPLETED, CAPTURE_TOLERANCE_MINOR, CaptureError, CaptureResponse, PayerName,
    PaymentGateway, VerifiedCapture, verify_capture,
};
pub use site_instance::SiteInstance;
pub use users::User;

mod allocations;
mod commands;
mod error;
mod funding_pools;
mod identity;
mod ledger;
mod money;
mod ops;
mod payments;
mod site_instance;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
