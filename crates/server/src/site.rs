use api_types::site::SiteInstance;
use axum::{Json, extract::State};

use crate::{ServerError, server::ServerState};

pub async fn get(State(state): State<ServerState>) -> Result<Json<SiteInstance>, ServerError> {
    let site = state.engine.site_instance().await?;
    Ok(Json(SiteInstance {
        site_title: site.site_title,
        site_headline: site.site_headline,
    }))
}
