//! Funding pool API endpoints

use api_types::funding_pool::{FundingPool, FundingPoolInput};
use axum::{Json, extract::State, http::StatusCode};
use engine::PoolCmd;

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath},
    server::ServerState,
    session::Moderator,
};

pub(crate) fn to_view(pool: engine::FundingPool) -> FundingPool {
    FundingPool {
        id: pool.id,
        name: pool.name,
        description: pool.description,
        goal_amount_minor: pool.goal_amount.cents(),
        current_amount_minor: pool.current_amount.cents(),
    }
}

fn pool_cmd(moderator: &str, payload: FundingPoolInput) -> PoolCmd {
    PoolCmd::new(moderator, payload.name, payload.goal_amount_minor)
        .description_opt(payload.description)
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<FundingPool>>, ServerError> {
    let pools = state.engine.funding_pools().await?;
    Ok(Json(pools.into_iter().map(to_view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<FundingPool>, ServerError> {
    let pool = state.engine.funding_pool(id).await?;
    Ok(Json(to_view(pool)))
}

/// Handle requests for creating a new funding pool
pub async fn create(
    Moderator(user): Moderator,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<FundingPoolInput>,
) -> Result<(StatusCode, Json<FundingPool>), ServerError> {
    let pool = state
        .engine
        .create_pool(pool_cmd(&user.subject_id, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(to_view(pool))))
}

pub async fn update(
    Moderator(user): Moderator,
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<FundingPoolInput>,
) -> Result<Json<FundingPool>, ServerError> {
    let pool = state
        .engine
        .update_pool(id, pool_cmd(&user.subject_id, payload))
        .await?;
    Ok(Json(to_view(pool)))
}

pub async fn delete(
    Moderator(user): Moderator,
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_pool(&user.subject_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
