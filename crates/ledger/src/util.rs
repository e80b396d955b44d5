//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the ledger enforces consistent invariants.

use uuid::Uuid;

use crate::{Currency, LedgerError, ResultLedger};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultLedger<Uuid> {
    Uuid::parse_str(value).map_err(|_| LedgerError::InvalidId(format!("invalid {label} id")))
}

/// Ensure an account currency matches the posting currency.
pub(crate) fn ensure_posting_currency(
    posting_currency: Currency,
    actual: Currency,
) -> ResultLedger<()> {
    if posting_currency != actual {
        return Err(LedgerError::CurrencyMismatch(format!(
            "posting currency is {}, got {}",
            posting_currency.code(),
            actual.code()
        )));
    }
    Ok(())
}
