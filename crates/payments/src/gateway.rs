//! External payment gateway client.
//!
//! The orchestrator talks to the gateway through the [`Gateway`] trait so
//! tests can substitute a mock; [`HttpGateway`] is the production
//! implementation (JSON over HTTPS, bearer-key auth, exponential-backoff
//! retries on transient failures).

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::json;
use thiserror::Error;

use crate::Currency;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("failed to decode gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Transient failures are safe to retry: the network layer, or a 5xx
    /// from the gateway itself.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { code, .. } => *code >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Parameters for creating a charge with the gateway.
#[derive(Clone, Debug)]
pub struct ChargeRequest {
    pub reference: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub email: String,
}

/// Successful charge initialization.
#[derive(Clone, Debug)]
pub struct ChargeAuthorization {
    pub authorization_url: String,
    pub access_code: Option<String>,
    /// Raw response body, retained on the payment record for audit.
    pub raw: String,
}

/// Gateway-reported state of a charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChargeState {
    Success,
    Failed,
    Pending,
}

/// Result of polling the gateway for a charge by reference.
#[derive(Clone, Debug)]
pub struct ChargeLookup {
    pub state: ChargeState,
    pub raw: String,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn initialize_charge(
        &self,
        charge: &ChargeRequest,
    ) -> Result<ChargeAuthorization, GatewayError>;

    async fn charge_status(&self, reference: &str) -> Result<ChargeLookup, GatewayError>;
}

pub struct HttpGateway {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await?;
        read_body(response).await
    }

    async fn get_json(&self, path: &str) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, GatewayError> {
    let code = response.status();
    let body = response.text().await?;
    if !code.is_success() {
        return Err(GatewayError::Status {
            code: code.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn data_field<'a>(
    parsed: &'a serde_json::Value,
    field: &str,
) -> Result<&'a serde_json::Value, GatewayError> {
    parsed
        .get("data")
        .and_then(|data| data.get(field))
        .ok_or_else(|| GatewayError::Decode(format!("missing data.{field}")))
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn initialize_charge(
        &self,
        charge: &ChargeRequest,
    ) -> Result<ChargeAuthorization, GatewayError> {
        let body = json!({
            "reference": charge.reference,
            "amount": charge.amount_minor,
            "currency": charge.currency.code(),
            "email": charge.email,
        });
        let raw = (|| async { self.post_json("/transaction/initialize", &body).await })
            .retry(ExponentialBuilder::default())
            .when(GatewayError::is_transient)
            .await?;

        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| GatewayError::Decode(err.to_string()))?;
        let authorization_url = data_field(&parsed, "authorization_url")?
            .as_str()
            .ok_or_else(|| GatewayError::Decode("data.authorization_url is not a string".into()))?
            .to_string();
        let access_code = parsed
            .get("data")
            .and_then(|data| data.get("access_code"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(ChargeAuthorization {
            authorization_url,
            access_code,
            raw,
        })
    }

    async fn charge_status(&self, reference: &str) -> Result<ChargeLookup, GatewayError> {
        let path = format!("/transaction/verify/{reference}");
        let raw = (|| async { self.get_json(&path).await })
            .retry(ExponentialBuilder::default())
            .when(GatewayError::is_transient)
            .await?;

        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| GatewayError::Decode(err.to_string()))?;
        let state = match data_field(&parsed, "status")?.as_str() {
            Some("success") => ChargeState::Success,
            Some("failed") => ChargeState::Failed,
            Some(_) => ChargeState::Pending,
            None => return Err(GatewayError::Decode("data.status is not a string".into())),
        };

        Ok(ChargeLookup { state, raw })
    }
}
