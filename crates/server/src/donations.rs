//! Donation endpoints: processor captures and moderator-recorded gifts.

use api_types::{
    AllocationNew, TransactionCreated,
    donation::{CaptureRequest, CaptureResponse, ExternalDonation},
};
use axum::{Json, extract::State, http::StatusCode};
use engine::{AllocationRequest, CAPTURE_STATUS_COMPLETED, CaptureDonationCmd, ExternalDonationCmd};

use crate::{
    ServerError,
    extract::ApiJson,
    server::ServerState,
    session::{Moderator, OptionalSession},
};

pub(crate) fn allocation_requests(allocations: &[AllocationNew]) -> Vec<AllocationRequest> {
    allocations
        .iter()
        .map(|a| AllocationRequest::new(a.funding_pool_id, a.amount_minor))
        .collect()
}

/// Capture an approved order and record it against the requested pools.
///
/// Works with or without a session; a logged-in donor is attributed unless
/// the donation is anonymous.
pub async fn capture(
    State(state): State<ServerState>,
    OptionalSession(donor): OptionalSession,
    ApiJson(payload): ApiJson<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ServerError> {
    let cmd = CaptureDonationCmd::new(payload.order_id, allocation_requests(&payload.allocations))
        .donor_opt(donor)
        .anonymous(payload.is_anonymous)
        .description_opt(payload.description);
    let entry = state.engine.capture_donation(cmd).await?;
    Ok(Json(CaptureResponse {
        status: CAPTURE_STATUS_COMPLETED.to_string(),
        transaction_id: entry.transaction_id.unwrap_or_default(),
        ledger_id: entry.id,
        amount_minor: entry.amount.cents(),
    }))
}

pub async fn external(
    Moderator(user): Moderator,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<ExternalDonation>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let cmd = ExternalDonationCmd::new(
        user.subject_id,
        payload.description,
        allocation_requests(&payload.allocations),
    );
    let entry = state.engine.external_donation(cmd).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id: entry.id })))
}
