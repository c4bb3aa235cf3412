//! Signed-cookie sessions.
//!
//! The cookie only carries the subject id. Whether that subject is a known
//! user, or a moderator, is looked up on every request.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use engine::User;

use crate::{ServerError, server::ServerState};

pub const SESSION_COOKIE: &str = "pool_party_session";

const SESSION_DAYS: i64 = 30;

pub fn session_subject(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|subject| !subject.is_empty())
}

pub fn start_session(jar: SignedCookieJar, subject_id: &str) -> SignedCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, subject_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS));
    jar.add(cookie)
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

async fn jar_from_parts(parts: &mut Parts, state: &ServerState) -> SignedCookieJar<Key> {
    match SignedCookieJar::<Key>::from_request_parts(parts, state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    }
}

/// Subject id of the signed session, if any. Never rejects.
pub struct OptionalSession(pub Option<String>);

impl FromRequestParts<ServerState> for OptionalSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = jar_from_parts(parts, state).await;
        Ok(Self(session_subject(&jar)))
    }
}

/// Subject id of the signed session; rejects with 401 when there is none.
pub struct Session(pub String);

impl FromRequestParts<ServerState> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = jar_from_parts(parts, state).await;
        session_subject(&jar)
            .map(Self)
            .ok_or(ServerError::Unauthenticated)
    }
}

/// A session whose user currently holds the moderator flag.
///
/// 401 without a session or for an unknown user, 403 for a non-moderator.
pub struct Moderator(pub User);

impl FromRequestParts<ServerState> for Moderator {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Session(subject) = Session::from_request_parts(parts, state).await?;
        let user = state.engine.authorize_moderator(&subject).await?;
        Ok(Self(user))
    }
}
