//! Login, session introspection and logout.

use api_types::{
    Message,
    auth::{GoogleCallback, UserView},
};
use axum::{Json, extract::State};
use axum_extra::extract::SignedCookieJar;
use engine::User;

use crate::{
    ServerError,
    extract::ApiJson,
    server::ServerState,
    session::{Session, end_session, start_session},
};

fn to_view(user: User) -> UserView {
    UserView {
        subject_id: user.subject_id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_moderator: user.is_moderator,
    }
}

/// Verify the identity token, upsert the user and start a session.
pub async fn google_callback(
    State(state): State<ServerState>,
    jar: SignedCookieJar,
    ApiJson(payload): ApiJson<GoogleCallback>,
) -> Result<(SignedCookieJar, Json<UserView>), ServerError> {
    if payload.credential.trim().is_empty() {
        return Err(ServerError::BadRequest("credential is required".to_string()));
    }
    let user = state.engine.login(&payload.credential).await?;
    let jar = start_session(jar, &user.subject_id);
    Ok((jar, Json(to_view(user))))
}

pub async fn me(
    State(state): State<ServerState>,
    Session(subject): Session,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&subject).await?;
    Ok(Json(to_view(user)))
}

pub async fn logout(
    Session(subject): Session,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<Message>) {
    tracing::info!(subject_id = %subject, "user logged out");
    (
        end_session(jar),
        Json(Message {
            message: "Successfully logged out".to_string(),
        }),
    )
}
