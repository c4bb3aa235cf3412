//! Singleton site configuration (title and headline).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the only row the table is expected to hold.
pub const SITE_INSTANCE_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInstance {
    pub site_title: String,
    pub site_headline: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "site_instance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub site_title: String,
    pub site_headline: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SiteInstance {
    fn from(model: Model) -> Self {
        Self {
            site_title: model.site_title,
            site_headline: model.site_headline,
        }
    }
}
