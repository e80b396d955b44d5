//! Webhook intake.
//!
//! The gateway gets `200 {"status":"received"}` as soon as the signature
//! checks out and the payload parses; processing continues on a spawned
//! task. The response never reflects the business outcome: the gateway's
//! redelivery policy is the backstop if background processing fails.

use axum::{Json, extract::State, http::HeaderMap};

use api_types::payment::WebhookAck;
use payments::{Envelope, signature};

use crate::{ServerError, server::ServerState};

pub const SIGNATURE_HEADER: &str = "x-kolo-signature";

pub async fn receive(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ServerError> {
    let signature_hex = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServerError::Unauthorized)?;
    if !signature::verify(body.as_bytes(), signature_hex, &state.webhook_secret) {
        return Err(ServerError::Unauthorized);
    }

    let envelope = Envelope::parse(&body)
        .map_err(|_| ServerError::Generic("malformed webhook body".to_string()))?;
    let event_id = envelope.event_id();
    let event_type = envelope.event.clone();
    let reference = envelope
        .data
        .get("reference")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let payments = state.payments.clone();
    let signature_hex = signature_hex.to_string();
    tokio::spawn(async move {
        if let Err(err) = payments
            .handle_event(&body, Some(signature_hex.as_str()))
            .await
        {
            // Logged with enough context for manual replay; the gateway has
            // already been acknowledged.
            tracing::error!(
                %event_id,
                %event_type,
                %reference,
                "webhook processing failed: {err}"
            );
        }
    });

    Ok(Json(WebhookAck {
        status: "received".to_string(),
    }))
}
