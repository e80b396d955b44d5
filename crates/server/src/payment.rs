//! Payment API endpoints: initiation, fallback verification, status.

use api_types::payment::{PaymentStatus as ApiStatus, PaymentStatusResponse, VerifyResponse};
use api_types::contribution::{ContributionInitiated, ContributionNew};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use payments::InitiateCmd;

fn map_status(status: payments::PaymentStatus) -> ApiStatus {
    match status {
        payments::PaymentStatus::Initiated => ApiStatus::Initiated,
        payments::PaymentStatus::Pending => ApiStatus::Pending,
        payments::PaymentStatus::Verified => ApiStatus::Verified,
        payments::PaymentStatus::Failed => ApiStatus::Failed,
    }
}

fn map_currency(currency: payments::Currency) -> api_types::Currency {
    match currency {
        payments::Currency::Ngn => api_types::Currency::Ngn,
        payments::Currency::Usd => api_types::Currency::Usd,
        payments::Currency::Eur => api_types::Currency::Eur,
        payments::Currency::Ghs => api_types::Currency::Ghs,
    }
}

pub(crate) fn map_api_currency(currency: api_types::Currency) -> payments::Currency {
    match currency {
        api_types::Currency::Ngn => payments::Currency::Ngn,
        api_types::Currency::Usd => payments::Currency::Usd,
        api_types::Currency::Eur => payments::Currency::Eur,
        api_types::Currency::Ghs => payments::Currency::Ghs,
    }
}

pub async fn initiate(
    State(state): State<ServerState>,
    Json(payload): Json<ContributionNew>,
) -> Result<(StatusCode, Json<ContributionInitiated>), ServerError> {
    let currency = map_api_currency(payload.currency.unwrap_or_default());
    let initiated = state
        .payments
        .initiate(InitiateCmd::new(
            payload.user_id,
            payload.goal_id,
            payload.amount_minor,
            currency,
            payload.email,
        ))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ContributionInitiated {
            payment_id: initiated.payment.id,
            reference: initiated.payment.reference,
            authorization_url: initiated.authorization_url,
            status: map_status(initiated.payment.status),
        }),
    ))
}

/// Fallback verification. Unlike the webhook, this path is synchronous and
/// surfaces errors to its caller: there is no redelivery to fall back on.
pub async fn verify(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<Json<VerifyResponse>, ServerError> {
    let status = state.payments.verify_reference(&reference).await?;
    Ok(Json(VerifyResponse {
        reference,
        status: map_status(status),
    }))
}

pub async fn status(
    State(state): State<ServerState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>, ServerError> {
    let payment = state.payments.status(payment_id).await?;
    Ok(Json(PaymentStatusResponse {
        payment_id: payment.id,
        reference: payment.reference,
        status: map_status(payment.status),
        amount_minor: payment.amount_minor,
        currency: map_currency(payment.currency),
        created_at: payment.created_at,
        updated_at: payment.updated_at,
    }))
}
