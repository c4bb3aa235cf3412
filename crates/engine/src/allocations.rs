//! Allocations: the share of a ledger entry assigned to one funding pool.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: i32,
    pub ledger_id: i32,
    pub funding_pool_id: i32,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "allocation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ledger_id: i32,
    pub funding_pool_id: i32,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledger::Entity",
        from = "Column::LedgerId",
        to = "super::ledger::Column::Id"
    )]
    Ledger,
    #[sea_orm(
        belongs_to = "super::funding_pools::Entity",
        from = "Column::FundingPoolId",
        to = "super::funding_pools::Column::Id"
    )]
    FundingPool,
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledger.def()
    }
}

impl Related<super::funding_pools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FundingPool.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new_allocation(ledger_id: i32, funding_pool_id: i32, amount: MoneyCents) -> Self {
        Self {
            id: ActiveValue::NotSet,
            ledger_id: ActiveValue::Set(ledger_id),
            funding_pool_id: ActiveValue::Set(funding_pool_id),
            amount_minor: ActiveValue::Set(amount.cents()),
        }
    }
}

impl From<Model> for Allocation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            ledger_id: model.ledger_id,
            funding_pool_id: model.funding_pool_id,
            amount: MoneyCents::new(model.amount_minor),
        }
    }
}
