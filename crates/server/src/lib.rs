use axum::{Json, http::StatusCode, response::IntoResponse};
use ledger::LedgerError;
use payments::PaymentError;

use serde::Serialize;
pub use contributions::{record_contribution, spawn_recorder};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod balances;
mod contributions;
mod payment;
mod server;
mod webhook;

pub enum ServerError {
    Ledger(LedgerError),
    Payment(PaymentError),
    Unauthorized,
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::InvalidPosting(_)
        | LedgerError::Unbalanced(_)
        | LedgerError::InvalidId(_)
        | LedgerError::CurrencyMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn status_for_payment_error(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        PaymentError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

fn message_for_payment_error(err: PaymentError) -> String {
    match err {
        PaymentError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        PaymentError::Gateway(gw_err) => {
            tracing::error!("gateway error: {gw_err}");
            "payment gateway error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Payment(err) => (
                status_for_payment_error(&err),
                message_for_payment_error(err),
            ),
            ServerError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "invalid signature".to_string())
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<PaymentError> for ServerError {
    fn from(value: PaymentError) -> Self {
        Self::Payment(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_not_found_maps_to_404() {
        let res = ServerError::from(LedgerError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn ledger_validation_maps_to_422() {
        let res = ServerError::from(LedgerError::InvalidPosting("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn payment_not_found_maps_to_404() {
        let res = ServerError::from(PaymentError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn payment_bad_payload_maps_to_400() {
        let res = ServerError::from(PaymentError::InvalidPayload("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let res = ServerError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
