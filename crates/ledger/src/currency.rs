use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// ISO 4217 currency code used by accounts and monetary values.
///
/// The platform collects primarily in `NGN`, but the ledger models currency
/// explicitly: an account is scoped to a single currency and a posting never
/// mixes currencies.
///
/// ## Minor units
///
/// Monetary values are stored as an `i64` number of **minor units**.
/// `minor_units()` returns how many decimal digits are used when converting
/// between major units (human input/output, e.g. `500.00 NGN`) and minor
/// units (stored integers, e.g. `50000`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
    Usd,
    Eur,
    Ghs,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Ghs => "GHS",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    ///
    /// Example: NGN uses 2 fraction digits (kobo).
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Ngn | Currency::Usd | Currency::Eur | Currency::Ghs => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GHS" => Ok(Currency::Ghs),
            other => Err(LedgerError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
