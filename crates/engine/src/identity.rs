//! Identity provider contract used by the login flow.

use async_trait::async_trait;
use thiserror::Error;

/// Claims extracted from a verified identity token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}
