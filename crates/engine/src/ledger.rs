//! Ledger entries.
//!
//! A `LedgerEntry` is one immutable monetary event. Its `amount` is the total
//! of the event; the per-pool split lives in `Allocation` rows and always sums
//! to the same amount.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Allocation, EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Sign applied to allocation amounts when deriving a pool balance.
    pub fn sign(self) -> i64 {
        match self {
            Self::Deposit => 1,
            Self::Withdrawal => -1,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i32,
    pub transaction_id: Option<String>,
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub user_subject_id: Option<String>,
    pub first_name: Option<String>,
    pub last_initial: Option<String>,
    pub anonymous: bool,
    pub description: Option<String>,
    pub allocations: Vec<Allocation>,
}

/// Global totals over full ledger amounts, independent of allocation splits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_donations: MoneyCents,
    pub total_withdrawals: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub entries: Vec<LedgerEntry>,
    pub totals: LedgerTotals,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub transaction_id: Option<String>,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
    pub kind: String,
    pub user_subject_id: Option<String>,
    pub first_name: Option<String>,
    pub last_initial: Option<String>,
    pub anonymous: bool,
    pub description: Option<String>,
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

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::NotSet,
            transaction_id: ActiveValue::Set(entry.transaction_id.clone()),
            amount_minor: ActiveValue::Set(entry.amount.cents()),
            created_at: ActiveValue::Set(entry.created_at),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            user_subject_id: ActiveValue::Set(entry.user_subject_id.clone()),
            first_name: ActiveValue::Set(entry.first_name.clone()),
            last_initial: ActiveValue::Set(entry.last_initial.clone()),
            anonymous: ActiveValue::Set(entry.anonymous),
            description: ActiveValue::Set(entry.description.clone()),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            transaction_id: model.transaction_id,
            amount: MoneyCents::new(model.amount_minor),
            created_at: model.created_at,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            user_subject_id: model.user_subject_id,
            first_name: model.first_name,
            last_initial: model.last_initial,
            anonymous: model.anonymous,
            description: model.description,
            allocations: Vec::new(),
        })
    }
}
