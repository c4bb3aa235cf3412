//! Users known to the system.
//!
//! A user is keyed by the identity provider's subject id. Rows are upserted on
//! every successful login; the moderator flag is only ever changed out of band.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub subject_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_moderator: bool,
}

/// Split a given/family name pair into the stored display fields.
///
/// Blank parts become `None`; the last name is reduced to its first character.
pub(crate) fn display_parts(first: &str, last: &str) -> (Option<String>, Option<String>) {
    let first = first.trim();
    let first = (!first.is_empty()).then(|| first.to_string());
    let initial = last.trim().chars().next().map(String::from);
    (first, initial)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_moderator: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            subject_id: model.subject_id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_moderator: model.is_moderator,
        }
    }
}
