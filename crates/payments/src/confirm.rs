//! The payment confirmation orchestrator.
//!
//! Two paths converge here: gateway webhooks ([`Payments::handle_event`])
//! and caller-initiated fallback verification
//! ([`Payments::verify_reference`]). Both drive the same compare-and-swap
//! transition on the payment row, so a payment reaches a terminal state
//! exactly once no matter how many confirmations arrive, in which order, or
//! how concurrently.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    ChargeRequest, ChargeState, Currency, Envelope, EventSink, Gateway, GatewayEvent, Payment,
    PaymentError, PaymentObserver, PaymentStatus, PaymentVerified, ResultPayments, TracingObserver,
    payment,
    webhook_events::{SaveOutcome, WebhookEvent},
};

/// Initiate a contribution payment.
#[derive(Clone, Debug)]
pub struct InitiateCmd {
    pub user_id: String,
    pub goal_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub email: String,
}

impl InitiateCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        goal_id: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            goal_id: goal_id.into(),
            amount_minor,
            currency,
            email: email.into(),
        }
    }
}

/// A payment handed off to the gateway, waiting for the payer.
#[derive(Clone, Debug)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub authorization_url: String,
}

pub struct Payments {
    pub(crate) database: DatabaseConnection,
    gateway: Arc<dyn Gateway>,
    events: Arc<dyn EventSink>,
    observer: Arc<dyn PaymentObserver>,
}

impl Payments {
    pub fn new(
        database: DatabaseConnection,
        gateway: Arc<dyn Gateway>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            database,
            gateway,
            events,
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PaymentObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Create a payment record and hand it to the gateway.
    ///
    /// The record is INITIATED until the gateway accepts the charge, then
    /// PENDING. A gateway failure surfaces to the caller and leaves the
    /// record INITIATED; re-initiating creates a fresh payment.
    pub async fn initiate(&self, cmd: InitiateCmd) -> ResultPayments<InitiatedPayment> {
        let payment = Payment::new(
            cmd.user_id,
            cmd.goal_id,
            cmd.amount_minor,
            cmd.currency,
            Utc::now(),
        )?;
        payment::ActiveModel::from(&payment).insert(&self.database).await?;

        let authorization = self
            .gateway
            .initialize_charge(&ChargeRequest {
                reference: payment.reference.clone(),
                amount_minor: payment.amount_minor,
                currency: payment.currency,
                email: cmd.email,
            })
            .await?;

        payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Pending.as_str()),
            )
            .col_expr(
                payment::Column::GatewayResponse,
                Expr::value(Some(authorization.raw.clone())),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::Id.eq(payment.id.to_string()))
            .filter(payment::Column::Status.eq(PaymentStatus::Initiated.as_str()))
            .exec(&self.database)
            .await?;

        let payment = self.require_payment(payment.id).await?;
        Ok(InitiatedPayment {
            payment,
            authorization_url: authorization.authorization_url,
        })
    }

    /// Primary (push) path: process one signature-verified webhook delivery.
    ///
    /// The raw event is persisted before any side effect so a crash after
    /// this point still allows recovery by replaying unprocessed events; the
    /// gateway's own redelivery is the backstop.
    pub async fn handle_event(
        &self,
        raw_body: &str,
        signature: Option<&str>,
    ) -> ResultPayments<()> {
        let envelope = Envelope::parse(raw_body)?;
        let event_id = envelope.event_id();

        if self.has_processed(&event_id).await? {
            self.observer.duplicate_event(&event_id);
            return Ok(());
        }

        let record = WebhookEvent::new(
            event_id.clone(),
            envelope.event.clone(),
            raw_body,
            signature.map(str::to_string),
            Utc::now(),
        );
        match self.save_event(&record).await? {
            SaveOutcome::Fresh => self.observer.event_received(&event_id, &envelope.event),
            SaveOutcome::Exists => {
                // Lost the insert race, or this is a redelivery of an event
                // whose processing never completed. Fully-processed rows were
                // already handled above; everything else is safe to process
                // again because the transitions below are no-ops on replay.
                if self.has_processed(&event_id).await? {
                    self.observer.duplicate_event(&event_id);
                    return Ok(());
                }
                self.observer.replayed_event(&event_id);
            }
        }

        match GatewayEvent::decode(&envelope)? {
            GatewayEvent::ChargeSucceeded(data) => {
                self.confirm_success(&data.reference, raw_body).await?;
            }
            GatewayEvent::ChargeFailed(data) => {
                self.confirm_failure(&data.reference, raw_body).await?;
            }
            GatewayEvent::TransferSucceeded(_) | GatewayEvent::TransferFailed(_) => {
                self.observer.transfer_event(&event_id, &envelope.event);
            }
            GatewayEvent::Unknown { event } => {
                self.observer.unrecognized_event(&event_id, &event);
            }
        }

        if let Err(err) = self.mark_processed(&event_id).await {
            self.observer
                .mark_processed_failed(&event_id, &err.to_string());
        }
        Ok(())
    }

    /// Fallback path: poll the gateway for a charge by reference and apply
    /// the same transition the webhook path would.
    ///
    /// Terminal payments return immediately with no side effects, so this
    /// endpoint and the webhook converge on one outcome regardless of which
    /// confirms first.
    pub async fn verify_reference(&self, reference: &str) -> ResultPayments<PaymentStatus> {
        let existing = self.require_by_reference(reference).await?;
        if existing.status.is_terminal() {
            return Ok(existing.status);
        }

        let lookup = self.gateway.charge_status(reference).await?;
        match lookup.state {
            ChargeState::Success => self.confirm_success(reference, &lookup.raw).await?,
            ChargeState::Failed => self.confirm_failure(reference, &lookup.raw).await?,
            ChargeState::Pending => return Ok(existing.status),
        }

        Ok(self.require_by_reference(reference).await?.status)
    }

    /// Read-only projection of one payment.
    pub async fn status(&self, payment_id: Uuid) -> ResultPayments<Payment> {
        self.require_payment(payment_id).await
    }

    pub async fn find_by_reference(&self, reference: &str) -> ResultPayments<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::Reference.eq(reference.to_string()))
            .one(&self.database)
            .await?;
        model.map(Payment::try_from).transpose()
    }

    async fn require_by_reference(&self, reference: &str) -> ResultPayments<Payment> {
        self.find_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentError::KeyNotFound("payment not exists".to_string()))
    }

    async fn require_payment(&self, payment_id: Uuid) -> ResultPayments<Payment> {
        let model = payment::Entity::find_by_id(payment_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| PaymentError::KeyNotFound("payment not exists".to_string()))?;
        Payment::try_from(model)
    }

    async fn confirm_success(&self, reference: &str, raw: &str) -> ResultPayments<()> {
        let current = self.require_by_reference(reference).await?;
        if current.status == PaymentStatus::Verified {
            // The fallback path (or an earlier delivery) already confirmed
            // this payment; a redundant confirmation is success.
            return Ok(());
        }

        if self
            .transition_terminal(current.id, PaymentStatus::Verified, raw)
            .await?
        {
            self.observer.payment_verified(current.id, reference);
            self.events.publish(PaymentVerified {
                id: Uuid::new_v4(),
                payment_id: current.id,
                user_id: current.user_id,
                goal_id: current.goal_id,
                amount_minor: current.amount_minor,
                currency: current.currency,
                created_at: Utc::now(),
            });
        } else {
            let now = self.require_by_reference(reference).await?;
            if now.status != PaymentStatus::Verified {
                self.observer
                    .ignored_transition(now.id, now.status, PaymentStatus::Verified);
            }
        }
        Ok(())
    }

    async fn confirm_failure(&self, reference: &str, raw: &str) -> ResultPayments<()> {
        let current = self.require_by_reference(reference).await?;
        if current.status == PaymentStatus::Failed {
            return Ok(());
        }

        if self
            .transition_terminal(current.id, PaymentStatus::Failed, raw)
            .await?
        {
            self.observer.payment_failed(current.id, reference);
        } else {
            let now = self.require_by_reference(reference).await?;
            if now.status != PaymentStatus::Failed {
                self.observer
                    .ignored_transition(now.id, now.status, PaymentStatus::Failed);
            }
        }
        Ok(())
    }

    /// Single-statement compare-and-swap into a terminal status.
    ///
    /// The filter on non-terminal status makes the transition race-safe:
    /// exactly one of any number of concurrent confirmations observes
    /// `rows_affected == 1` and owns the side effects.
    async fn transition_terminal(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        raw: &str,
    ) -> ResultPayments<bool> {
        let result = payment::Entity::update_many()
            .col_expr(payment::Column::Status, Expr::value(status.as_str()))
            .col_expr(
                payment::Column::GatewayResponse,
                Expr::value(Some(raw.to_string())),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::Id.eq(payment_id.to_string()))
            .filter(payment::Column::Status.is_not_in([
                PaymentStatus::Verified.as_str(),
                PaymentStatus::Failed.as_str(),
            ]))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected == 1)
    }
}
