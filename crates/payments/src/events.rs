//! Typed gateway events and the downstream "payment verified" event.
//!
//! Inbound webhook bodies are decoded into tagged variants at the boundary;
//! the orchestrator never reaches into untyped payload maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Currency, PaymentError, ResultPayments};

/// The outer webhook body: `{"event": "...", "data": {...}}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn parse(raw: &str) -> ResultPayments<Self> {
        serde_json::from_str(raw)
            .map_err(|err| PaymentError::InvalidPayload(format!("malformed webhook body: {err}")))
    }

    /// Deterministic event id, stable under redelivery.
    ///
    /// Preference order matters: the gateway's own event/charge id, then the
    /// transaction reference, then a generated id only as a last resort.
    pub fn event_id(&self) -> String {
        if let Some(id) = self.data.get("id").and_then(|v| v.as_i64()) {
            return format!("{}:{id}", self.event);
        }
        if let Some(reference) = self.data.get("reference").and_then(|v| v.as_str())
            && !reference.is_empty()
        {
            return format!("{}:{reference}", self.event);
        }
        format!("{}:{}", self.event, Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChargeData {
    #[serde(default)]
    pub id: Option<i64>,
    pub reference: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransferData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Gateway event, decoded per declared kind.
///
/// Unrecognized kinds are preserved rather than rejected so new gateway
/// event types do not break the webhook intake.
#[derive(Clone, Debug)]
pub enum GatewayEvent {
    ChargeSucceeded(ChargeData),
    ChargeFailed(ChargeData),
    TransferSucceeded(TransferData),
    TransferFailed(TransferData),
    Unknown { event: String },
}

impl GatewayEvent {
    pub fn decode(envelope: &Envelope) -> ResultPayments<Self> {
        let decoded = match envelope.event.as_str() {
            "charge.success" => Self::ChargeSucceeded(decode_data(envelope)?),
            "charge.failed" => Self::ChargeFailed(decode_data(envelope)?),
            "transfer.success" => Self::TransferSucceeded(decode_data(envelope)?),
            "transfer.failed" => Self::TransferFailed(decode_data(envelope)?),
            other => Self::Unknown {
                event: other.to_string(),
            },
        };
        Ok(decoded)
    }
}

fn decode_data<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> ResultPayments<T> {
    serde_json::from_value(envelope.data.clone()).map_err(|err| {
        PaymentError::InvalidPayload(format!("malformed {} data: {err}", envelope.event))
    })
}

/// Published when a payment reaches VERIFIED for the first time.
///
/// Delivery is at-least-once; consumers dedupe by `payment_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerified {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub user_id: String,
    pub goal_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// Where the orchestrator hands off `PaymentVerified` events.
///
/// Injected so the payment and ledger subsystems never share state; the
/// default wiring is an in-process channel consumed by the contribution
/// recorder.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: PaymentVerified);
}

/// An [`EventSink`] backed by an unbounded tokio channel.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<PaymentVerified>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PaymentVerified>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: PaymentVerified) {
        if self.sender.send(event).is_err() {
            tracing::error!("payment verified consumer is gone; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_prefers_gateway_id_over_reference() {
        let envelope = Envelope::parse(
            r#"{"event":"charge.success","data":{"id":42,"reference":"klo-abc"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.event_id(), "charge.success:42");
    }

    #[test]
    fn event_id_falls_back_to_reference() {
        let envelope =
            Envelope::parse(r#"{"event":"charge.success","data":{"reference":"klo-abc"}}"#)
                .unwrap();
        assert_eq!(envelope.event_id(), "charge.success:klo-abc");
    }

    #[test]
    fn event_id_is_stable_across_redelivery() {
        let raw = r#"{"event":"charge.success","data":{"id":7,"reference":"klo-x"}}"#;
        let first = Envelope::parse(raw).unwrap().event_id();
        let second = Envelope::parse(raw).unwrap().event_id();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_kinds_decode_without_error() {
        let envelope =
            Envelope::parse(r#"{"event":"subscription.create","data":{"id":1}}"#).unwrap();
        let decoded = GatewayEvent::decode(&envelope).unwrap();
        assert!(matches!(decoded, GatewayEvent::Unknown { event } if event == "subscription.create"));
    }

    #[test]
    fn charge_event_requires_a_reference() {
        let envelope = Envelope::parse(r#"{"event":"charge.success","data":{"id":5}}"#).unwrap();
        assert!(GatewayEvent::decode(&envelope).is_err());
    }
}
