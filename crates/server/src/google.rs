//! Google ID token verification through the tokeninfo endpoint.

use std::time::Duration;

use async_trait::async_trait;
use engine::{IdentityError, IdentityVerifier, VerifiedIdentity};
use reqwest::Url;
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    client_id: String,
    tokeninfo_url: Url,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> Result<Self, IdentityError> {
        Self::with_endpoint(client_id, TOKENINFO_URL)
    }

    /// Same as [`GoogleVerifier::new`] against another tokeninfo endpoint.
    pub fn with_endpoint(
        client_id: impl Into<String>,
        tokeninfo_url: &str,
    ) -> Result<Self, IdentityError> {
        let tokeninfo_url = Url::parse(tokeninfo_url)
            .map_err(|err| IdentityError::Unavailable(format!("invalid tokeninfo url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        Ok(Self {
            client_id: client_id.into(),
            tokeninfo_url,
            http,
        })
    }
}

fn check_claims(info: TokenInfo, client_id: &str) -> Result<VerifiedIdentity, IdentityError> {
    if info.aud != client_id {
        tracing::warn!(aud = %info.aud, "identity token issued for another client");
        return Err(IdentityError::InvalidCredential);
    }
    if !ISSUERS.contains(&info.iss.as_str()) {
        tracing::warn!(iss = %info.iss, "identity token from unexpected issuer");
        return Err(IdentityError::InvalidCredential);
    }
    if info.sub.is_empty() {
        return Err(IdentityError::InvalidCredential);
    }

    Ok(VerifiedIdentity {
        subject_id: info.sub,
        email: info.email.unwrap_or_default(),
        given_name: info.given_name.unwrap_or_default(),
        family_name: info.family_name.unwrap_or_default(),
    })
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let mut url = self.tokeninfo_url.clone();
        url.query_pairs_mut().append_pair("id_token", credential);

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;

        let status = res.status();
        if status.is_server_error() {
            return Err(IdentityError::Unavailable(format!("tokeninfo returned {status}")));
        }
        if !status.is_success() {
            return Err(IdentityError::InvalidCredential);
        }
        let info = res
            .json::<TokenInfo>()
            .await
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        check_claims(info, &self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, iss: &str) -> TokenInfo {
        TokenInfo {
            aud: aud.to_string(),
            iss: iss.to_string(),
            sub: "1098".to_string(),
            email: Some("ada@example.com".to_string()),
            given_name: Some("Ada".to_string()),
            family_name: None,
        }
    }

    #[test]
    fn matching_claims_are_accepted() {
        let identity = check_claims(info("client", "accounts.google.com"), "client").unwrap();
        assert_eq!(identity.subject_id, "1098");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.given_name, "Ada");
        assert_eq!(identity.family_name, "");

        assert!(check_claims(info("client", "https://accounts.google.com"), "client").is_ok());
    }

    #[test]
    fn wrong_audience_or_issuer_is_rejected() {
        assert_eq!(
            check_claims(info("other", "accounts.google.com"), "client"),
            Err(IdentityError::InvalidCredential)
        );
        assert_eq!(
            check_claims(info("client", "evil.example.com"), "client"),
            Err(IdentityError::InvalidCredential)
        );
    }
}
