//! Observability seam for the confirmation orchestrator.
//!
//! The orchestrator reports notable moments through an injected
//! [`PaymentObserver`] instead of reaching into any global metrics or
//! logging state. The default implementation logs via `tracing`; tests
//! inject recording observers.

use uuid::Uuid;

use crate::PaymentStatus;

pub trait PaymentObserver: Send + Sync {
    fn event_received(&self, event_id: &str, event_type: &str);

    /// A delivery for an event id that is already fully processed.
    fn duplicate_event(&self, event_id: &str);

    /// A redelivery of a stored but not-yet-processed event.
    fn replayed_event(&self, event_id: &str);

    fn unrecognized_event(&self, event_id: &str, event_type: &str);

    fn transfer_event(&self, event_id: &str, event_type: &str);

    fn payment_verified(&self, payment_id: Uuid, reference: &str);

    fn payment_failed(&self, payment_id: Uuid, reference: &str);

    /// A confirmation arrived for a payment already in a different terminal
    /// state; the stored state wins.
    fn ignored_transition(&self, payment_id: Uuid, current: PaymentStatus, wanted: PaymentStatus);

    /// Marking the event processed failed after the business effect was
    /// applied. The effect is idempotent on replay, so this is reported but
    /// not surfaced.
    fn mark_processed_failed(&self, event_id: &str, error: &str);
}

/// Default observer: structured logs, no state.
pub struct TracingObserver;

impl PaymentObserver for TracingObserver {
    fn event_received(&self, event_id: &str, event_type: &str) {
        tracing::info!(event_id, event_type, "webhook event received");
    }

    fn duplicate_event(&self, event_id: &str) {
        tracing::info!(event_id, "duplicate webhook event skipped");
    }

    fn replayed_event(&self, event_id: &str) {
        tracing::info!(event_id, "replaying unprocessed webhook event");
    }

    fn unrecognized_event(&self, event_id: &str, event_type: &str) {
        tracing::warn!(event_id, event_type, "unrecognized webhook event kind");
    }

    fn transfer_event(&self, event_id: &str, event_type: &str) {
        tracing::info!(event_id, event_type, "transfer event acknowledged");
    }

    fn payment_verified(&self, payment_id: Uuid, reference: &str) {
        tracing::info!(%payment_id, reference, "payment verified");
    }

    fn payment_failed(&self, payment_id: Uuid, reference: &str) {
        tracing::info!(%payment_id, reference, "payment failed");
    }

    fn ignored_transition(&self, payment_id: Uuid, current: PaymentStatus, wanted: PaymentStatus) {
        tracing::warn!(
            %payment_id,
            current = current.as_str(),
            wanted = wanted.as_str(),
            "ignored transition on terminal payment"
        );
    }

    fn mark_processed_failed(&self, event_id: &str, error: &str) {
        tracing::error!(event_id, error, "failed to mark webhook event processed");
    }
}
