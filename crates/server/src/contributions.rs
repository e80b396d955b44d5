//! The bridge between the payment and ledger subsystems.
//!
//! Consumes `PaymentVerified` events (delivered at-least-once) and posts the
//! matching contribution to the ledger. The payment id rides along as the
//! posting idempotency key, so replays and duplicate deliveries record
//! exactly one contribution per payment.

use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use ledger::{ContributionCmd, Ledger, LedgerError};
use payments::PaymentVerified;

fn map_currency(currency: payments::Currency) -> ledger::Currency {
    match currency {
        payments::Currency::Ngn => ledger::Currency::Ngn,
        payments::Currency::Usd => ledger::Currency::Usd,
        payments::Currency::Eur => ledger::Currency::Eur,
        payments::Currency::Ghs => ledger::Currency::Ghs,
    }
}

/// Record one verified payment as a ledger contribution.
///
/// Transient storage failures are retried with backoff; everything else
/// bubbles up to the caller.
pub async fn record_contribution(
    ledger: &Ledger,
    event: &PaymentVerified,
) -> Result<Uuid, LedgerError> {
    let cmd = ContributionCmd::new(
        event.user_id.clone(),
        event.goal_id.clone(),
        event.amount_minor,
        map_currency(event.currency),
        event.created_at,
    )
    .payment_id(event.payment_id)
    .description("goal contribution");

    (|| async { ledger.post_contribution(cmd.clone()).await })
        .retry(ExponentialBuilder::default())
        .when(|err: &LedgerError| matches!(err, LedgerError::Database(_)))
        .await
}

/// Spawn the recorder task. It runs until the event channel closes.
pub fn spawn_recorder(
    ledger: Arc<Ledger>,
    mut events: UnboundedReceiver<PaymentVerified>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match record_contribution(&ledger, &event).await {
                Ok(transaction_id) => {
                    tracing::info!(
                        payment_id = %event.payment_id,
                        %transaction_id,
                        "contribution recorded"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        payment_id = %event.payment_id,
                        goal_id = %event.goal_id,
                        "failed to record contribution: {err}"
                    );
                }
            }
        }
    })
}
