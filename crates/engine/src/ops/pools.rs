//! Funding pool lifecycle: create, update, delete.
//!
//! Every operation re-checks the moderator flag inside its own transaction
//! before touching a row.

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QuerySelect, TransactionTrait, prelude::*,
};

use crate::{EngineError, FundingPool, PoolCmd, ResultEngine, allocations, funding_pools};

use super::{Engine, access::require_moderator, balances::require_pool, require_name, with_tx};

fn validate_pool(cmd: &PoolCmd) -> ResultEngine<()> {
    require_name(&cmd.name, "pool name is required")?;
    if !cmd.goal_amount.is_positive() {
        return Err(EngineError::Validation(
            "goal amount must be a positive number".to_string(),
        ));
    }
    Ok(())
}

async fn lock_pool(
    db_tx: &DatabaseTransaction,
    pool_id: i32,
) -> ResultEngine<funding_pools::Model> {
    funding_pools::Entity::find_by_id(pool_id)
        .lock_exclusive()
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("funding pool not found".to_string()))
}

impl Engine {
    pub async fn create_pool(&self, cmd: PoolCmd) -> ResultEngine<FundingPool> {
        with_tx!(self, |db_tx| {
            require_moderator(&db_tx, &cmd.moderator).await?;
            validate_pool(&cmd)?;

            let model = funding_pools::ActiveModel::new_pool(
                &cmd.name,
                cmd.description.clone(),
                cmd.goal_amount,
            )
            .insert(&db_tx)
            .await?;
            let pool = require_pool(&db_tx, model.id).await?;
            tracing::info!(pool_id = pool.id, moderator = %cmd.moderator, "funding pool created");
            Ok::<_, EngineError>(pool)
        })
    }

    /// Replace name, description and goal; the balance is re-derived afterwards.
    pub async fn update_pool(&self, pool_id: i32, cmd: PoolCmd) -> ResultEngine<FundingPool> {
        with_tx!(self, |db_tx| {
            require_moderator(&db_tx, &cmd.moderator).await?;
            validate_pool(&cmd)?;

            let model = lock_pool(&db_tx, pool_id).await?;
            let mut active: funding_pools::ActiveModel = model.into();
            active.name = ActiveValue::Set(cmd.name.clone());
            active.description = ActiveValue::Set(cmd.description.clone());
            active.goal_amount_minor = ActiveValue::Set(cmd.goal_amount.cents());
            active.update(&db_tx).await?;

            let pool = require_pool(&db_tx, pool_id).await?;
            tracing::info!(pool_id, moderator = %cmd.moderator, "funding pool updated");
            Ok::<_, EngineError>(pool)
        })
    }

    /// Delete a pool that has never received an allocation.
    ///
    /// The pool row is locked before allocations are counted; recorders take
    /// at least a shared lock on the same row, so no allocation can appear
    /// between the check and the delete.
    pub async fn delete_pool(&self, moderator: &str, pool_id: i32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_moderator(&db_tx, moderator).await?;
            lock_pool(&db_tx, pool_id).await?;

            let references = allocations::Entity::find()
                .filter(allocations::Column::FundingPoolId.eq(pool_id))
                .count(&db_tx)
                .await?;
            if references > 0 {
                return Err(EngineError::Conflict(
                    "cannot delete funding pool with existing donations".to_string(),
                ));
            }

            funding_pools::Entity::delete_by_id(pool_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(pool_id, moderator, "funding pool deleted");
            Ok::<_, EngineError>(())
        })
    }
}
