use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;

use migration::MigratorTrait;
use payments::{
    ChargeAuthorization, ChargeLookup, ChargeRequest, ChargeState, Currency, EventSink, Gateway,
    GatewayError, InitiateCmd, PaymentError, PaymentStatus, PaymentVerified, Payments,
};

struct MockGateway {
    charge_states: Mutex<HashMap<String, ChargeState>>,
}

impl MockGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            charge_states: Mutex::new(HashMap::new()),
        })
    }

    fn set_charge_state(&self, reference: &str, state: ChargeState) {
        self.charge_states
            .lock()
            .unwrap()
            .insert(reference.to_string(), state);
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn initialize_charge(
        &self,
        charge: &ChargeRequest,
    ) -> Result<ChargeAuthorization, GatewayError> {
        Ok(ChargeAuthorization {
            authorization_url: format!("https://gateway.test/pay/{}", charge.reference),
            access_code: Some("acc_test".to_string()),
            raw: json!({
                "status": true,
                "data": {
                    "authorization_url": format!("https://gateway.test/pay/{}", charge.reference),
                    "access_code": "acc_test",
                    "reference": charge.reference,
                }
            })
            .to_string(),
        })
    }

    async fn charge_status(&self, reference: &str) -> Result<ChargeLookup, GatewayError> {
        let state = self
            .charge_states
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .unwrap_or(ChargeState::Pending);
        let status = match state {
            ChargeState::Success => "success",
            ChargeState::Failed => "failed",
            ChargeState::Pending => "pending",
        };
        Ok(ChargeLookup {
            state,
            raw: json!({"status": true, "data": {"status": status, "reference": reference}})
                .to_string(),
        })
    }
}

struct RecordingSink {
    published: Mutex<Vec<PaymentVerified>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<PaymentVerified> {
        self.published.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: PaymentVerified) {
        self.published.lock().unwrap().push(event);
    }
}

async fn payments_with_db() -> (Payments, DatabaseConnection, Arc<MockGateway>, Arc<RecordingSink>)
{
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let gateway = MockGateway::new();
    let sink = RecordingSink::new();
    let payments = Payments::new(db.clone(), gateway.clone(), sink.clone());
    (payments, db, gateway, sink)
}

async fn initiate_pending(payments: &Payments) -> (uuid::Uuid, String) {
    let initiated = payments
        .initiate(InitiateCmd::new(
            "user-1",
            "goal-1",
            50_000,
            Currency::Ngn,
            "user-1@example.com",
        ))
        .await
        .unwrap();
    assert_eq!(initiated.payment.status, PaymentStatus::Pending);
    (initiated.payment.id, initiated.payment.reference)
}

fn charge_success_body(reference: &str) -> String {
    json!({
        "event": "charge.success",
        "data": {"id": 9001, "reference": reference, "amount": 50_000, "currency": "NGN"}
    })
    .to_string()
}

async fn webhook_event_count(db: &DatabaseConnection) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS cnt FROM webhook_events",
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "cnt").unwrap()
}

#[tokio::test]
async fn repeated_webhook_delivery_verifies_once() {
    let (payments, db, _gateway, sink) = payments_with_db().await;
    let (payment_id, reference) = initiate_pending(&payments).await;

    let body = charge_success_body(&reference);
    for _ in 0..3 {
        payments.handle_event(&body, None).await.unwrap();
    }

    let payment = payments.status(payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Verified);
    assert!(payment.gateway_response.is_some());

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payment_id, payment_id);
    assert_eq!(events[0].amount_minor, 50_000);
    assert_eq!(webhook_event_count(&db).await, 1);
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_store_one_event_row() {
    let (payments, db, _gateway, sink) = payments_with_db().await;
    let (_, reference) = initiate_pending(&payments).await;

    let body = charge_success_body(&reference);
    let (first, second) = tokio::join!(
        payments.handle_event(&body, None),
        payments.handle_event(&body, None)
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(webhook_event_count(&db).await, 1);
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn charge_failed_is_terminal_and_emits_nothing() {
    let (payments, _db, _gateway, sink) = payments_with_db().await;
    let (payment_id, reference) = initiate_pending(&payments).await;

    let body = json!({
        "event": "charge.failed",
        "data": {"id": 9002, "reference": reference}
    })
    .to_string();
    payments.handle_event(&body, None).await.unwrap();

    let payment = payments.status(payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(sink.events().is_empty());

    // A late success confirmation does not resurrect a failed payment.
    payments
        .handle_event(&charge_success_body(&reference), None)
        .await
        .unwrap();
    let payment = payments.status(payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn fallback_then_webhook_converges_without_duplicate_effects() {
    let (payments, _db, gateway, sink) = payments_with_db().await;
    let (payment_id, reference) = initiate_pending(&payments).await;

    gateway.set_charge_state(&reference, ChargeState::Success);
    let status = payments.verify_reference(&reference).await.unwrap();
    assert_eq!(status, PaymentStatus::Verified);
    assert_eq!(sink.events().len(), 1);

    // The redundant webhook for the same charge is a no-op.
    payments
        .handle_event(&charge_success_body(&reference), None)
        .await
        .unwrap();
    let payment = payments.status(payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Verified);
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn webhook_then_fallback_converges_without_duplicate_effects() {
    let (payments, _db, gateway, sink) = payments_with_db().await;
    let (payment_id, reference) = initiate_pending(&payments).await;

    payments
        .handle_event(&charge_success_body(&reference), None)
        .await
        .unwrap();
    assert_eq!(sink.events().len(), 1);

    // Even with the gateway now reporting failure, the stored terminal state
    // wins: the fallback path must not flip a verified payment.
    gateway.set_charge_state(&reference, ChargeState::Failed);
    let status = payments.verify_reference(&reference).await.unwrap();
    assert_eq!(status, PaymentStatus::Verified);

    let payment = payments.status(payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Verified);
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn fallback_keeps_pending_when_gateway_is_undecided() {
    let (payments, _db, _gateway, sink) = payments_with_db().await;
    let (_, reference) = initiate_pending(&payments).await;

    let status = payments.verify_reference(&reference).await.unwrap();
    assert_eq!(status, PaymentStatus::Pending);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn unknown_event_kind_is_acknowledged_and_deduplicated() {
    let (payments, db, _gateway, sink) = payments_with_db().await;

    let body = json!({
        "event": "subscription.create",
        "data": {"id": 77}
    })
    .to_string();
    payments.handle_event(&body, None).await.unwrap();
    payments.handle_event(&body, None).await.unwrap();

    assert_eq!(webhook_event_count(&db).await, 1);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn unknown_reference_and_malformed_body_are_rejected() {
    let (payments, _db, _gateway, _sink) = payments_with_db().await;

    let unknown = payments
        .handle_event(&charge_success_body("klo-missing"), None)
        .await;
    assert!(matches!(unknown, Err(PaymentError::KeyNotFound(_))));

    let malformed = payments.handle_event("not json", None).await;
    assert!(matches!(malformed, Err(PaymentError::InvalidPayload(_))));

    let missing = payments.verify_reference("klo-missing").await;
    assert!(matches!(missing, Err(PaymentError::KeyNotFound(_))));
}
