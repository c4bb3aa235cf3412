//! PayPal Orders v2 capture client.

use std::time::Duration;

use async_trait::async_trait;
use engine::{CaptureError, CaptureResponse, PaymentGateway};
use reqwest::{Url, header::CONTENT_TYPE};
use serde::Deserialize;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PayPalClient {
    base_url: Url,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Order {
    status: String,
    #[serde(default)]
    payer: Option<Payer>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct Payer {
    #[serde(default)]
    name: Option<PayerName>,
}

#[derive(Debug, Deserialize)]
struct PayerName {
    given_name: Option<String>,
    surname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
    status: String,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

impl PayPalClient {
    pub fn new(
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, CaptureError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| CaptureError::CaptureFailed(format!("invalid base url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| CaptureError::CaptureFailed(err.to_string()))?;
        Ok(Self {
            base_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CaptureError> {
        self.base_url
            .join(path)
            .map_err(|err| CaptureError::CaptureFailed(format!("invalid endpoint {path}: {err}")))
    }

    async fn access_token(&self) -> Result<String, CaptureError> {
        let res = self
            .http
            .post(self.endpoint("/v1/oauth2/token")?)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(transport)?;

        if !res.status().is_success() {
            return Err(CaptureError::CaptureFailed(format!(
                "token request returned {}",
                res.status()
            )));
        }
        let token = res.json::<AccessToken>().await.map_err(transport)?;
        Ok(token.access_token)
    }
}

fn transport(err: reqwest::Error) -> CaptureError {
    CaptureError::CaptureFailed(err.to_string())
}

/// Flatten the processor's order into the fields the engine verifies.
///
/// Only the first capture of the first purchase unit is considered; the
/// checkout flow creates single-unit orders.
fn into_capture_response(order: Order) -> Result<CaptureResponse, CaptureError> {
    let capture = order
        .purchase_units
        .into_iter()
        .filter_map(|unit| unit.payments)
        .flat_map(|payments| payments.captures)
        .next()
        .ok_or_else(|| CaptureError::CaptureFailed("order has no capture".to_string()))?;

    // An order can be COMPLETED while its capture is still PENDING.
    let status = if order.status == "COMPLETED" {
        capture.status
    } else {
        order.status
    };
    let name = order.payer.and_then(|payer| payer.name);

    Ok(CaptureResponse {
        status,
        captured_amount: capture.amount.value,
        currency: capture.amount.currency_code,
        capture_id: capture.id,
        payer_given_name: name.as_ref().and_then(|n| n.given_name.clone()),
        payer_surname: name.and_then(|n| n.surname),
    })
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn capture(&self, order_id: &str) -> Result<CaptureResponse, CaptureError> {
        if order_id.is_empty() || !order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CaptureError::CaptureFailed(format!(
                "malformed order id {order_id:?}"
            )));
        }
        let token = self.access_token().await?;
        let res = self
            .http
            .post(self.endpoint(&format!("/v2/checkout/orders/{order_id}/capture"))?)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CaptureError::CaptureFailed(format!(
                "capture returned {status}: {body}"
            )));
        }
        let order = res.json::<Order>().await.map_err(transport)?;
        into_capture_response(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_status: &str, capture_status: &str) -> Order {
        Order {
            status: order_status.to_string(),
            payer: Some(Payer {
                name: Some(PayerName {
                    given_name: Some("Grace".to_string()),
                    surname: Some("Hopper".to_string()),
                }),
            }),
            purchase_units: vec![PurchaseUnit {
                payments: Some(Payments {
                    captures: vec![Capture {
                        id: "3C679366HH908993F".to_string(),
                        status: capture_status.to_string(),
                        amount: Amount {
                            currency_code: "USD".to_string(),
                            value: "50.00".to_string(),
                        },
                    }],
                }),
            }],
        }
    }

    #[test]
    fn completed_order_is_flattened() {
        let resp = into_capture_response(order("COMPLETED", "COMPLETED")).unwrap();
        assert_eq!(resp.status, "COMPLETED");
        assert_eq!(resp.captured_amount, "50.00");
        assert_eq!(resp.currency, "USD");
        assert_eq!(resp.capture_id, "3C679366HH908993F");
        assert_eq!(resp.payer_given_name.as_deref(), Some("Grace"));
        assert_eq!(resp.payer_surname.as_deref(), Some("Hopper"));
    }

    #[test]
    fn pending_capture_is_not_reported_completed() {
        let resp = into_capture_response(order("COMPLETED", "PENDING")).unwrap();
        assert_eq!(resp.status, "PENDING");
    }

    #[test]
    fn order_without_capture_fails() {
        let empty = Order {
            status: "COMPLETED".to_string(),
            payer: None,
            purchase_units: vec![],
        };
        assert!(into_capture_response(empty).is_err());
    }

    #[tokio::test]
    async fn malformed_order_id_is_rejected_locally() {
        let client = PayPalClient::new("http://127.0.0.1:9", "id", "secret").unwrap();
        let err = client.capture("../../v1/admin").await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureFailed(_)));
    }
}
