use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::EngineError;

use api_types::ErrorBody;
pub use google::GoogleVerifier;
pub use paypal::PayPalClient;
pub use server::{RouterOptions, ServerState, SetupError, router, run_with_listener};

mod auth;
mod donations;
mod extract;
mod funding_pools;
mod google;
mod ledger;
mod paypal;
mod server;
mod session;
mod site;
mod withdrawals;

pub mod types {
    pub mod funding_pool {
        pub use api_types::funding_pool::{FundingPool, FundingPoolInput};
    }

    pub mod auth {
        pub use api_types::auth::{GoogleCallback, UserView};
    }

    pub mod ledger {
        pub use api_types::ledger::{Allocation, LedgerEntry, LedgerResponse, TransactionType};
    }

    pub mod donation {
        pub use api_types::donation::{CaptureRequest, CaptureResponse, ExternalDonation};
    }

    pub mod withdrawal {
        pub use api_types::withdrawal::WithdrawalNew;
    }

    pub use api_types::{AllocationNew, ErrorBody, Message, TransactionCreated};
}

/// Message returned for a captured amount that does not match the allocations.
const AMOUNT_MISMATCH_MESSAGE: &str = "Transaction amount mismatch. Please contact support.";

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    BadRequest(String),
    Unauthenticated,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthenticated => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        EngineError::Config(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_)
        | EngineError::Conflict(_)
        | EngineError::SecurityMismatch { .. }
        | EngineError::InsufficientFunds(_) => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Config(detail) => {
            tracing::error!("configuration error: {detail}");
            "internal server error".to_string()
        }
        EngineError::Upstream(detail) => {
            tracing::error!("upstream error: {detail}");
            "payment or identity provider unavailable".to_string()
        }
        EngineError::SecurityMismatch { .. } => AMOUNT_MISMATCH_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::BadRequest(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "not authenticated".to_string())
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}
