//! Read side: pool balances and ledger totals derived from ledger rows.
//!
//! Nothing here writes. Balances are aggregated on every call; there is no
//! cached balance to drift from the ledger.

use std::collections::HashMap;

use sea_orm::{
    ConnectionTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Allocation, EngineError, FundingPool, Ledger, LedgerEntry, LedgerTotals, MoneyCents,
    ResultEngine, allocations, funding_pools, ledger,
};

use super::{Engine, with_tx};

/// Signed allocation sum: deposits add, withdrawals subtract.
///
/// Rows produced by a LEFT JOIN with no allocation contribute 0.
const POOL_BALANCE_SQL: &str = r#"CAST(COALESCE(SUM(CASE WHEN "ledger"."kind" = 'deposit' THEN "allocation"."amount_minor" WHEN "ledger"."kind" = 'withdrawal' THEN -"allocation"."amount_minor" ELSE 0 END), 0) AS BIGINT)"#;

const TOTAL_DONATIONS_SQL: &str = r#"CAST(COALESCE(SUM(CASE WHEN "ledger"."kind" = 'deposit' THEN "ledger"."amount_minor" ELSE 0 END), 0) AS BIGINT)"#;

const TOTAL_WITHDRAWALS_SQL: &str = r#"CAST(COALESCE(SUM(CASE WHEN "ledger"."kind" = 'withdrawal' THEN "ledger"."amount_minor" ELSE 0 END), 0) AS BIGINT)"#;

#[derive(Debug, FromQueryResult)]
struct PoolBalanceRow {
    id: i32,
    name: String,
    description: Option<String>,
    goal_amount_minor: i64,
    current_amount_minor: i64,
}

impl From<PoolBalanceRow> for FundingPool {
    fn from(row: PoolBalanceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            goal_amount: MoneyCents::new(row.goal_amount_minor),
            current_amount: MoneyCents::new(row.current_amount_minor),
        }
    }
}

fn pools_with_balance() -> Select<funding_pools::Entity> {
    funding_pools::Entity::find()
        .select_only()
        .column(funding_pools::Column::Id)
        .column(funding_pools::Column::Name)
        .column(funding_pools::Column::Description)
        .column(funding_pools::Column::GoalAmountMinor)
        .column_as(Expr::cust(POOL_BALANCE_SQL), "current_amount_minor")
        .join(JoinType::LeftJoin, funding_pools::Relation::Allocations.def())
        .join(JoinType::LeftJoin, allocations::Relation::Ledger.def())
        .group_by(funding_pools::Column::Id)
        .group_by(funding_pools::Column::Name)
        .group_by(funding_pools::Column::Description)
        .group_by(funding_pools::Column::GoalAmountMinor)
}

/// Load one pool with its derived balance, or `None` if it does not exist.
pub(super) async fn find_pool<C: ConnectionTrait>(
    db: &C,
    pool_id: i32,
) -> ResultEngine<Option<FundingPool>> {
    let row = pools_with_balance()
        .filter(funding_pools::Column::Id.eq(pool_id))
        .into_model::<PoolBalanceRow>()
        .one(db)
        .await?;
    Ok(row.map(FundingPool::from))
}

pub(super) async fn require_pool<C: ConnectionTrait>(
    db: &C,
    pool_id: i32,
) -> ResultEngine<FundingPool> {
    find_pool(db, pool_id)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("funding pool not found".to_string()))
}

/// Current balance of each requested pool, as seen by `db`.
///
/// Pools with no allocations map to zero. Unknown ids also map to zero;
/// callers check existence separately.
pub(super) async fn pool_balances<C: ConnectionTrait>(
    db: &C,
    pool_ids: &[i32],
) -> ResultEngine<HashMap<i32, MoneyCents>> {
    let rows: Vec<(i32, i64)> = allocations::Entity::find()
        .select_only()
        .column(allocations::Column::FundingPoolId)
        .column_as(Expr::cust(POOL_BALANCE_SQL), "balance_minor")
        .join(JoinType::InnerJoin, allocations::Relation::Ledger.def())
        .filter(allocations::Column::FundingPoolId.is_in(pool_ids.iter().copied()))
        .group_by(allocations::Column::FundingPoolId)
        .into_tuple()
        .all(db)
        .await?;

    let mut balances: HashMap<i32, MoneyCents> = pool_ids
        .iter()
        .map(|id| (*id, MoneyCents::ZERO))
        .collect();
    for (pool_id, balance) in rows {
        balances.insert(pool_id, MoneyCents::new(balance));
    }
    Ok(balances)
}

async fn totals<C: ConnectionTrait>(db: &C) -> ResultEngine<LedgerTotals> {
    let row: Option<(i64, i64)> = ledger::Entity::find()
        .select_only()
        .column_as(Expr::cust(TOTAL_DONATIONS_SQL), "total_donations_minor")
        .column_as(Expr::cust(TOTAL_WITHDRAWALS_SQL), "total_withdrawals_minor")
        .into_tuple()
        .one(db)
        .await?;

    Ok(row
        .map(|(donations, withdrawals)| LedgerTotals {
            total_donations: MoneyCents::new(donations),
            total_withdrawals: MoneyCents::new(withdrawals),
        })
        .unwrap_or_default())
}

impl Engine {
    /// Every funding pool with its current amount, ordered by id.
    pub async fn funding_pools(&self) -> ResultEngine<Vec<FundingPool>> {
        let rows = pools_with_balance()
            .order_by_asc(funding_pools::Column::Id)
            .into_model::<PoolBalanceRow>()
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(FundingPool::from).collect())
    }

    /// One funding pool with its current amount.
    ///
    /// Returns [`EngineError::KeyNotFound`] when the pool does not exist.
    pub async fn funding_pool(&self, pool_id: i32) -> ResultEngine<FundingPool> {
        require_pool(&self.database, pool_id).await
    }

    /// Total donated and withdrawn, over full ledger amounts.
    pub async fn ledger_totals(&self) -> ResultEngine<LedgerTotals> {
        totals(&self.database).await
    }

    /// All ledger entries, newest first, each with its allocations, plus totals.
    ///
    /// Entries and totals are read in one transaction so they agree with each
    /// other.
    pub async fn ledger(&self) -> ResultEngine<Ledger> {
        with_tx!(self, |db_tx| {
            let models: Vec<ledger::Model> = ledger::Entity::find()
                .order_by_desc(ledger::Column::CreatedAt)
                .order_by_desc(ledger::Column::Id)
                .all(&db_tx)
                .await?;

            let allocation_models: Vec<allocations::Model> = allocations::Entity::find()
                .order_by_asc(allocations::Column::Id)
                .all(&db_tx)
                .await?;

            let mut by_ledger: HashMap<i32, Vec<Allocation>> = HashMap::new();
            for model in allocation_models {
                by_ledger
                    .entry(model.ledger_id)
                    .or_default()
                    .push(Allocation::from(model));
            }

            let mut entries = Vec::with_capacity(models.len());
            for model in models {
                let mut entry = LedgerEntry::try_from(model)?;
                entry.allocations = by_ledger.remove(&entry.id).unwrap_or_default();
                entries.push(entry);
            }

            let totals = totals(&db_tx).await?;
            Ok::<_, EngineError>(Ledger { entries, totals })
        })
    }
}
