//! Payment confirmation subsystem.
//!
//! Owns the payment records and the durable webhook-event log, and drives
//! the payment state machine (INITIATED → PENDING → VERIFIED | FAILED) from
//! two converging sources: gateway webhooks and caller-initiated fallback
//! verification. A payment reaching VERIFIED for the first time emits
//! exactly one [`PaymentVerified`] event; everything else is a no-op by
//! construction.

pub use confirm::{InitiateCmd, InitiatedPayment, Payments};
pub use currency::Currency;
pub use error::PaymentError;
pub use events::{
    ChannelSink, ChargeData, Envelope, EventSink, GatewayEvent, PaymentVerified, TransferData,
};
pub use gateway::{
    ChargeAuthorization, ChargeLookup, ChargeRequest, ChargeState, Gateway, GatewayError,
    HttpGateway,
};
pub use observer::{PaymentObserver, TracingObserver};
pub use payment::{Payment, PaymentStatus};
pub use webhook_events::WebhookEvent;

pub mod signature;

mod confirm;
mod currency;
mod error;
mod events;
mod gateway;
mod observer;
mod payment;
mod webhook_events;

type ResultPayments<T> = Result<T, PaymentError>;
