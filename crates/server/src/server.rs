use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{balances, payment, webhook};
use ledger::Ledger;
use payments::Payments;

#[derive(Clone)]
pub struct ServerState {
    pub ledger: Arc<Ledger>,
    pub payments: Arc<Payments>,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: String,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/contributions", post(payment::initiate))
        .route("/payments/webhook", post(webhook::receive))
        .route("/payments/{reference}/verify", get(payment::verify))
        .route("/payments/{payment_id}/status", get(payment::status))
        .route("/balances", get(balances::get))
        .with_state(state)
}

pub async fn run(state: ServerState) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
