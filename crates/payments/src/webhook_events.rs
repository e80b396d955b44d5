//! Durable webhook-event log (the idempotency gate).
//!
//! Every inbound gateway event is keyed by a deterministic event id and
//! stored before any side effect runs. The primary key doubles as the
//! idempotency gate: concurrent deliveries of the same event race on the
//! insert, and the loser observes a uniqueness violation instead of creating
//! a second row.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, QueryFilter, SqlErr, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Payments, ResultPayments};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub signature: Option<String>,
    pub processed: bool,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
        signature: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload: payload.into(),
            signature,
            processed: false,
            received_at,
            processed_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub signature: Option<String>,
    pub processed: bool,
    pub received_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&WebhookEvent> for ActiveModel {
    fn from(event: &WebhookEvent) -> Self {
        Self {
            event_id: ActiveValue::Set(event.event_id.clone()),
            event_type: ActiveValue::Set(event.event_type.clone()),
            payload: ActiveValue::Set(event.payload.clone()),
            signature: ActiveValue::Set(event.signature.clone()),
            processed: ActiveValue::Set(event.processed),
            received_at: ActiveValue::Set(event.received_at),
            processed_at: ActiveValue::Set(event.processed_at),
        }
    }
}

/// Outcome of trying to persist an event row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SaveOutcome {
    /// The row was written by this call.
    Fresh,
    /// Another delivery already wrote the row.
    Exists,
}

impl Payments {
    /// `true` once the event has been fully processed.
    pub(crate) async fn has_processed(&self, event_id: &str) -> ResultPayments<bool> {
        let model = Entity::find_by_id(event_id.to_string())
            .one(&self.database)
            .await?;
        Ok(model.map(|m| m.processed).unwrap_or(false))
    }

    /// Persist the raw event before any side effect runs.
    ///
    /// Losing the insert race to a concurrent delivery is not an error: the
    /// caller decides whether to continue based on the stored row's
    /// `processed` flag.
    pub(crate) async fn save_event(&self, event: &WebhookEvent) -> ResultPayments<SaveOutcome> {
        match ActiveModel::from(event).insert(&self.database).await {
            Ok(_) => Ok(SaveOutcome::Fresh),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(SaveOutcome::Exists)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn mark_processed(&self, event_id: &str) -> ResultPayments<()> {
        Entity::update_many()
            .col_expr(Column::Processed, Expr::value(true))
            .col_expr(Column::ProcessedAt, Expr::value(Some(Utc::now())))
            .filter(Column::EventId.eq(event_id.to_string()))
            .exec(&self.database)
            .await?;
        Ok(())
    }
}
