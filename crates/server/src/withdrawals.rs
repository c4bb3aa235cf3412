use api_types::{TransactionCreated, withdrawal::WithdrawalNew};
use axum::{Json, extract::State, http::StatusCode};
use engine::WithdrawalCmd;

use crate::{
    ServerError, donations::allocation_requests, extract::ApiJson, server::ServerState,
    session::Moderator,
};

/// Record a withdrawal split across one or more pools.
pub async fn create(
    Moderator(user): Moderator,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<WithdrawalNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let cmd = WithdrawalCmd::new(
        user.subject_id,
        payload.description,
        allocation_requests(&payload.allocations),
    );
    let entry = state.engine.withdraw(cmd).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id: entry.id })))
}
