//! Ledger balance queries (consumed by goal-progress computation).

use api_types::balance::{AccountKind as ApiKind, BalanceQuery, BalanceResponse};
use axum::{
    Json,
    extract::{Query, State},
};

use crate::{ServerError, server::ServerState};
use ledger::{AccountKind, AccountRef};

fn map_kind(kind: ApiKind) -> AccountKind {
    match kind {
        ApiKind::User => AccountKind::User,
        ApiKind::Goal => AccountKind::Goal,
        ApiKind::Escrow => AccountKind::Escrow,
        ApiKind::Revenue => AccountKind::Revenue,
    }
}

pub(crate) fn map_ledger_currency(currency: api_types::Currency) -> ledger::Currency {
    match currency {
        api_types::Currency::Ngn => ledger::Currency::Ngn,
        api_types::Currency::Usd => ledger::Currency::Usd,
        api_types::Currency::Eur => ledger::Currency::Eur,
        api_types::Currency::Ghs => ledger::Currency::Ghs,
    }
}

pub async fn get(
    State(state): State<ServerState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let currency = query.currency.unwrap_or_default();
    let reference = AccountRef::new(
        query.owner_id.clone(),
        map_kind(query.kind),
        map_ledger_currency(currency),
    );
    let balance_minor = state.ledger.balance(&reference).await?;

    Ok(Json(BalanceResponse {
        owner_id: query.owner_id,
        kind: query.kind,
        currency,
        balance_minor,
    }))
}
