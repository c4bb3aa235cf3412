//! Payment verification adapter.
//!
//! The engine never talks to the payment processor directly. A
//! [`PaymentGateway`] captures an order and reports what happened;
//! [`verify_capture`] turns that report into a trusted [`VerifiedCapture`]
//! the recorder can use.

use async_trait::async_trait;
use thiserror::Error;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Maximum distance, in minor units, tolerated between the captured amount and
/// the declared allocation sum.
pub const CAPTURE_TOLERANCE_MINOR: u64 = 1;

/// The only capture status treated as success.
pub const CAPTURE_STATUS_COMPLETED: &str = "COMPLETED";

/// What the payment processor reported for a capture request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureResponse {
    pub status: String,
    /// Decimal string as reported by the processor, e.g. `"50.00"`.
    pub captured_amount: String,
    pub currency: String,
    pub capture_id: String,
    pub payer_given_name: Option<String>,
    pub payer_surname: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, order_id: &str) -> Result<CaptureResponse, CaptureError>;
}

/// Name reported on the processor's payer record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PayerName {
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

/// A capture the engine trusts: completed, in the expected currency, positive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedCapture {
    pub amount: MoneyCents,
    pub capture_id: String,
    pub payer: PayerName,
}

pub fn verify_capture(response: CaptureResponse, currency: &str) -> ResultEngine<VerifiedCapture> {
    if response.status != CAPTURE_STATUS_COMPLETED {
        return Err(EngineError::Upstream(format!(
            "payment not completed, status {}",
            response.status
        )));
    }
    if !response.currency.eq_ignore_ascii_case(currency) {
        return Err(EngineError::Upstream(format!(
            "unexpected capture currency {}",
            response.currency
        )));
    }
    if response.capture_id.trim().is_empty() {
        return Err(EngineError::Upstream("capture id missing".to_string()));
    }

    let amount: MoneyCents = response.captured_amount.parse().map_err(|_| {
        EngineError::Upstream(format!(
            "unparseable capture amount {:?}",
            response.captured_amount
        ))
    })?;
    if !amount.is_positive() {
        return Err(EngineError::Upstream(format!(
            "non-positive capture amount {amount}"
        )));
    }

    Ok(VerifiedCapture {
        amount,
        capture_id: response.capture_id,
        payer: PayerName {
            given_name: response.payer_given_name,
            surname: response.payer_surname,
        },
    })
}
