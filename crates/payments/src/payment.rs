//! Payment records.
//!
//! A [`Payment`] is one attempt to collect money from a payer through the
//! external gateway. It is keyed both by an internal id and by the gateway
//! reference, is mutated only by the confirmation orchestrator, and is never
//! deleted. VERIFIED and FAILED are terminal.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, PaymentError, ResultPayments};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Initiated,
    Pending,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }

    /// Terminal statuses admit no further transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = PaymentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "initiated" => Ok(Self::Initiated),
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "failed" => Ok(Self::Failed),
            other => Err(PaymentError::InvalidPayload(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Merchant reference sent to (and echoed back by) the gateway. Unique.
    pub reference: String,
    pub user_id: String,
    pub goal_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    /// Raw gateway payload retained verbatim for audit/debugging.
    pub gateway_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        user_id: impl Into<String>,
        goal_id: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> ResultPayments<Self> {
        if amount_minor <= 0 {
            return Err(PaymentError::InvalidPayload(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            reference: format!("klo-{}", id.simple()),
            user_id: user_id.into(),
            goal_id: goal_id.into(),
            amount_minor,
            currency,
            status: PaymentStatus::Initiated,
            gateway_response: None,
            created_at,
            updated_at: created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub reference: String,
    pub user_id: String,
    pub goal_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub gateway_response: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            reference: ActiveValue::Set(payment.reference.clone()),
            user_id: ActiveValue::Set(payment.user_id.clone()),
            goal_id: ActiveValue::Set(payment.goal_id.clone()),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            currency: ActiveValue::Set(payment.currency.code().to_string()),
            status: ActiveValue::Set(payment.status.as_str().to_string()),
            gateway_response: ActiveValue::Set(payment.gateway_response.clone()),
            created_at: ActiveValue::Set(payment.created_at),
            updated_at: ActiveValue::Set(payment.updated_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = PaymentError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| PaymentError::KeyNotFound("payment not exists".to_string()))?,
            reference: model.reference,
            user_id: model.user_id,
            goal_id: model.goal_id,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            status: PaymentStatus::try_from(model.status.as_str())?,
            gateway_response: model.gateway_response,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
