//! Cached per-account balances.
//!
//! A [`BalanceSnapshot`] is a derived projection: it must always equal the
//! full replay of the account's entries (credits minus debits). It exists
//! purely for read performance and is recomputed from history, never
//! incrementally patched, on every posting that touches the account.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_id: Uuid,
    pub balance_minor: i64,
    pub currency: Currency,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    pub balance_minor: i64,
    pub currency: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for BalanceSnapshot {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            account_id: parse_uuid(&model.account_id, "account")?,
            balance_minor: model.balance_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            updated_at: model.updated_at,
        })
    }
}
