//! Ledger transactions.
//!
//! A [`LedgerTransaction`] is one business event (a contribution, a refund,
//! a withdrawal). It owns exactly two [`Entry`](crate::Entry) rows and is
//! immutable once committed; corrections are new reversing transactions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, ResultLedger, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Contribution,
    Refund,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::Refund => "refund",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "contribution" => Ok(Self::Contribution),
            "refund" => Ok(Self::Refund),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(LedgerError::InvalidPosting(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Lifecycle of a transaction row.
///
/// `Created` only ever exists on an in-flight domain value; the row is
/// persisted as `Completed` inside the posting unit of work, so no partial
/// state is observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Created,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created" => Ok(Self::Created),
            "completed" => Ok(Self::Completed),
            other => Err(LedgerError::InvalidPosting(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub metadata: BTreeMap<String, String>,
    pub idempotency_key: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn new(
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        description: Option<String>,
        metadata: BTreeMap<String, String>,
        idempotency_key: Option<String>,
        transaction_date: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidPosting(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            description,
            amount_minor,
            currency,
            status: TransactionStatus::Created,
            metadata,
            idempotency_key,
            transaction_date,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub metadata: String,
    pub idempotency_key: Option<String>,
    pub transaction_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerTransaction> for ActiveModel {
    fn from(tx: &LedgerTransaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            metadata: ActiveValue::Set(
                serde_json::to_string(&tx.metadata).unwrap_or_else(|_| "{}".to_string()),
            ),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            transaction_date: ActiveValue::Set(tx.transaction_date),
        }
    }
}

impl TryFrom<Model> for LedgerTransaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            description: model.description,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            metadata: serde_json::from_str(&model.metadata).unwrap_or_default(),
            idempotency_key: model.idempotency_key,
            transaction_date: model.transaction_date,
        })
    }
}
