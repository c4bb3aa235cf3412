use std::{path::PathBuf, sync::Arc, time::Duration};

use api_types::ErrorBody;
use axum::{
    Json, Router,
    extract::FromRef,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use engine::Engine;
use thiserror::Error;
use tower_http::{
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{auth, donations, funding_pools, ledger, site, withdrawals};

/// Minimum length of the cookie signing secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("session secret must be at least 32 bytes")]
    SessionSecretTooShort,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    key: Key,
}

impl ServerState {
    /// Build the shared state, deriving the cookie signing key from `secret`.
    pub fn new(engine: Engine, secret: &[u8]) -> Result<Self, SetupError> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(SetupError::SessionSecretTooShort);
        }
        Ok(Self {
            engine: Arc::new(engine),
            key: Key::derive_from(secret),
        })
    }
}

impl FromRef<ServerState> for Key {
    fn from_ref(state: &ServerState) -> Self {
        state.key.clone()
    }
}

#[derive(Clone, Debug)]
pub struct RouterOptions {
    /// Directory served for non-API paths, with `index.html` fallback.
    pub static_dir: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            static_dir: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

async fn api_not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not found".to_string(),
        }),
    )
}

/// Give the timeout layer's bare 408 the usual error body.
async fn timeout_body(res: Response) -> Response {
    if res.status() != StatusCode::REQUEST_TIMEOUT {
        return res;
    }
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(ErrorBody {
            error: "request timed out".to_string(),
        }),
    )
        .into_response()
}

fn api_router() -> Router<ServerState> {
    Router::new()
        .route(
            "/funding-pools",
            get(funding_pools::list).post(funding_pools::create),
        )
        .route(
            "/funding-pools/{id}",
            get(funding_pools::get)
                .put(funding_pools::update)
                .delete(funding_pools::delete),
        )
        .route("/auth/google/callback", post(auth::google_callback))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/ledger", get(ledger::list))
        .route("/donations/capture", post(donations::capture))
        .route("/donations/external", post(donations::external))
        .route("/withdrawals", post(withdrawals::create))
        .route("/site-instance", get(site::get))
        .fallback(api_not_found)
}

pub fn router(state: ServerState, options: RouterOptions) -> Router {
    let mut app = Router::new().nest("/api", api_router());

    if let Some(dir) = options.static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    with_layers(app.with_state(state), options.request_timeout)
}

fn with_layers(app: Router, request_timeout: Duration) -> Router {
    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        request_timeout,
    ))
    .layer(middleware::map_response(timeout_body))
    .layer(TraceLayer::new_for_http())
}

pub async fn run_with_listener(
    state: ServerState,
    options: RouterOptions,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state, options))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
