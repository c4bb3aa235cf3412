use sea_orm::{ActiveValue, prelude::*, sea_query::OnConflict};

use crate::{EngineError, ResultEngine, SiteInstance, site_instance};

use super::{Engine, require_name};

impl Engine {
    /// The singleton site configuration.
    ///
    /// A missing row is a deployment fault, reported as `Config`.
    pub async fn site_instance(&self) -> ResultEngine<SiteInstance> {
        site_instance::Entity::find_by_id(site_instance::SITE_INSTANCE_ID)
            .one(&self.database)
            .await?
            .map(SiteInstance::from)
            .ok_or_else(|| EngineError::Config("site instance not seeded".to_string()))
    }

    /// Create or replace the singleton site configuration.
    pub async fn set_site_instance(
        &self,
        title: &str,
        headline: Option<&str>,
    ) -> ResultEngine<SiteInstance> {
        let title = require_name(title, "site title is required")?;
        let model = site_instance::ActiveModel {
            id: ActiveValue::Set(site_instance::SITE_INSTANCE_ID),
            site_title: ActiveValue::Set(title.to_string()),
            site_headline: ActiveValue::Set(super::normalize_optional_text(headline)),
        };
        site_instance::Entity::insert(model)
            .on_conflict(
                OnConflict::column(site_instance::Column::Id)
                    .update_columns([
                        site_instance::Column::SiteTitle,
                        site_instance::Column::SiteHeadline,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        self.site_instance().await
    }
}
