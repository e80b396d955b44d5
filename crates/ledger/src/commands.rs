//! Command structs for ledger operations.
//!
//! These types group parameters for write operations (post/contribution/
//! refund), keeping call sites readable and avoiding long argument lists.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountRef, Currency, TransactionKind};

/// Post one balanced money movement between two accounts.
#[derive(Clone, Debug)]
pub struct PostingCmd {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub debit: AccountRef,
    pub credit: AccountRef,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub idempotency_key: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl PostingCmd {
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        debit: AccountRef,
        credit: AccountRef,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            amount_minor,
            currency,
            debit,
            credit,
            description: None,
            metadata: BTreeMap::new(),
            idempotency_key: None,
            transaction_date,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Record a verified contribution: debit the contributor, credit the goal.
#[derive(Clone, Debug)]
pub struct ContributionCmd {
    pub user_id: String,
    pub goal_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub payment_id: Option<Uuid>,
    pub description: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl ContributionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        goal_id: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            goal_id: goal_id.into(),
            amount_minor,
            currency,
            payment_id: None,
            description: None,
            transaction_date,
        }
    }

    /// Correlate the posting with the payment that funded it. The id doubles
    /// as the idempotency key, so at-least-once delivery of the same payment
    /// records exactly one contribution.
    #[must_use]
    pub fn payment_id(mut self, payment_id: Uuid) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Reverse a prior contribution: debit the goal, credit the contributor.
#[derive(Clone, Debug)]
pub struct RefundCmd {
    pub contribution_id: Uuid,
    pub reason: Option<String>,
    pub idempotency_key: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl RefundCmd {
    #[must_use]
    pub fn new(contribution_id: Uuid, transaction_date: DateTime<Utc>) -> Self {
        Self {
            contribution_id,
            reason: None,
            idempotency_key: None,
            transaction_date,
        }
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
