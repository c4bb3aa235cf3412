use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{EngineError, IdentityVerifier, PaymentGateway, ResultEngine};

mod access;
mod balances;
mod donations;
mod pools;
mod recorder;
mod site;
mod withdrawals;

const DEFAULT_CURRENCY: &str = "USD";

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    payments: Option<Arc<dyn PaymentGateway>>,
    identity: Option<Arc<dyn IdentityVerifier>>,
    currency: String,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("payments", &self.payments.is_some())
            .field("identity", &self.identity.is_some())
            .field("currency", &self.currency)
            .finish()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Currency every captured payment must be denominated in.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    fn payments(&self) -> ResultEngine<&dyn PaymentGateway> {
        self.payments
            .as_deref()
            .ok_or_else(|| EngineError::Config("payment gateway not configured".to_string()))
    }

    fn identity(&self) -> ResultEngine<&dyn IdentityVerifier> {
        self.identity
            .as_deref()
            .ok_or_else(|| EngineError::Config("identity verifier not configured".to_string()))
    }
}

/// Validate a required name without altering what gets stored.
fn require_name<'a>(value: &'a str, message: &str) -> ResultEngine<&'a str> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(message.to_string()));
    }
    Ok(value)
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    payments: Option<Arc<dyn PaymentGateway>>,
    identity: Option<Arc<dyn IdentityVerifier>>,
    currency: Option<String>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Payment processor used by `capture_donation`.
    pub fn payments(mut self, gateway: Arc<dyn PaymentGateway>) -> EngineBuilder {
        self.payments = Some(gateway);
        self
    }

    /// Identity provider used by `login`.
    pub fn identity(mut self, verifier: Arc<dyn IdentityVerifier>) -> EngineBuilder {
        self.identity = Some(verifier);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> EngineBuilder {
        self.currency = Some(currency.into());
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let currency = match self.currency {
            Some(code) if code.trim().is_empty() => {
                return Err(EngineError::Config("currency must not be empty".to_string()));
            }
            Some(code) => code.trim().to_ascii_uppercase(),
            None => DEFAULT_CURRENCY.to_string(),
        };
        Ok(Engine {
            database: self.database,
            payments: self.payments,
            identity: self.identity,
            currency,
        })
    }
}
