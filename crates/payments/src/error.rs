//! The module contains the errors the payment subsystem can throw.

use sea_orm::DbErr;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Payment custom errors.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for PaymentError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidPayload(a), Self::InvalidPayload(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Gateway(a), Self::Gateway(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
