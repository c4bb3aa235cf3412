use std::{path::PathBuf, sync::Arc, time::Duration};

use migration::{Migrator, MigratorTrait};
use server::{GoogleVerifier, PayPalClient, RouterOptions, ServerState};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pool_party={level},server={level},engine={level},security={level},tower_http={level}",
            level = settings.log_level
        ))
        .init();

    let db = connect_database(&settings.database_url).await?;

    let payments = PayPalClient::new(
        &settings.paypal_api_base,
        settings.paypal_client_id.as_str(),
        settings.paypal_client_secret.as_str(),
    )?;
    let identity = GoogleVerifier::new(settings.google_client_id.as_str())?;

    let engine = engine::Engine::builder()
        .database(db)
        .payments(Arc::new(payments))
        .identity(Arc::new(identity))
        .currency(settings.currency.as_str())
        .build()
        .await?;
    tracing::info!("engine ready, capturing payments in {}", engine.currency());

    let state = ServerState::new(engine, settings.session_secret.as_bytes())?;
    let options = RouterOptions {
        static_dir: settings.static_dir.map(PathBuf::from),
        request_timeout: Duration::from_secs(settings.request_timeout_secs),
    };

    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(state, options, listener).await?;

    Ok(())
}

async fn connect_database(
    url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database migrated");
    Ok(database)
}
