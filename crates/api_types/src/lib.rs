use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
    Usd,
    Eur,
    Ghs,
}

pub mod contribution {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionNew {
        pub user_id: String,
        pub goal_id: String,
        pub amount_minor: i64,
        pub currency: Option<Currency>,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionInitiated {
        pub payment_id: Uuid,
        pub reference: String,
        pub authorization_url: String,
        pub status: payment::PaymentStatus,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentStatus {
        Initiated,
        Pending,
        Verified,
        Failed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentStatusResponse {
        pub payment_id: Uuid,
        pub reference: String,
        pub status: PaymentStatus,
        pub amount_minor: i64,
        pub currency: Currency,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Returned by the fallback verification endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifyResponse {
        pub reference: String,
        pub status: PaymentStatus,
    }

    /// The webhook acknowledgement. Always returned once the payload parses,
    /// regardless of downstream processing.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WebhookAck {
        pub status: String,
    }
}

pub mod balance {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        User,
        Goal,
        Escrow,
        Revenue,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceQuery {
        pub owner_id: String,
        pub kind: AccountKind,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceResponse {
        pub owner_id: String,
        pub kind: AccountKind,
        pub currency: Currency,
        pub balance_minor: i64,
    }
}
