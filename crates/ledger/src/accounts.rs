//! Ledger accounts.
//!
//! An [`Account`] is a balance bucket owned by some entity (a user, a goal,
//! the escrow pool, or platform revenue). Accounts are created lazily on the
//! first posting that references their `(owner_id, kind, currency)` triple
//! and are never deleted; the triple is unique.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Goal,
    Escrow,
    Revenue,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Goal => "goal",
            Self::Escrow => "escrow",
            Self::Revenue => "revenue",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Self::User),
            "goal" => Ok(Self::Goal),
            "escrow" => Ok(Self::Escrow),
            "revenue" => Ok(Self::Revenue),
            other => Err(LedgerError::InvalidPosting(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// Selector for an account by its identifying triple.
///
/// `owner_id` is a polymorphic reference (a user id, a goal id, ...) and is
/// deliberately not a foreign key into any other table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub owner_id: String,
    pub kind: AccountKind,
    pub currency: Currency,
}

impl AccountRef {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, kind: AccountKind, currency: Currency) -> Self {
        Self {
            owner_id: owner_id.into(),
            kind,
            currency,
        }
    }

    #[must_use]
    pub fn user(owner_id: impl Into<String>, currency: Currency) -> Self {
        Self::new(owner_id, AccountKind::User, currency)
    }

    #[must_use]
    pub fn goal(owner_id: impl Into<String>, currency: Currency) -> Self {
        Self::new(owner_id, AccountKind::Goal, currency)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(reference: &AccountRef, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: reference.owner_id.clone(),
            kind: reference.kind,
            currency: reference.currency,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub kind: String,
    pub currency: String,
    pub created_at: DateTimeUtc,
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

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            owner_id: ActiveValue::Set(account.owner_id.clone()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            owner_id: model.owner_id,
            kind: AccountKind::try_from(model.kind.as_str())?,
            currency: Currency::try_from(model.currency.as_str())?,
            created_at: model.created_at,
        })
    }
}
