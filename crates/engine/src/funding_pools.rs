//! Funding pools: named goals money is allocated to.
//!
//! Only the goal is stored. The current amount is always derived from the
//! allocations that reference the pool (see `ops::balances`).

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPool {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub goal_amount: MoneyCents,
    pub current_amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "funding_pool")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub goal_amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocations::Entity")]
    Allocations,
}

impl Related<super::allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new_pool(name: &str, description: Option<String>, goal: MoneyCents) -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(name.to_string()),
            description: ActiveValue::Set(description),
            goal_amount_minor: ActiveValue::Set(goal.cents()),
        }
    }
}
