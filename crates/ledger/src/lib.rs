//! Double-entry ledger engine.
//!
//! Every money movement is recorded as one [`LedgerTransaction`] owning
//! exactly two [`Entry`] rows: one debit and one credit of equal amount.
//! Balances are derived data ([`BalanceSnapshot`]) recomputed from the full
//! entry history inside the same unit of work that writes new entries.

pub use accounts::{Account, AccountKind, AccountRef};
pub use commands::{ContributionCmd, PostingCmd, RefundCmd};
pub use currency::Currency;
pub use entries::{Direction, Entry};
pub use error::LedgerError;
pub use ops::{Ledger, LedgerBuilder};
pub use snapshots::BalanceSnapshot;
pub use transactions::{LedgerTransaction, TransactionKind, TransactionStatus};

mod accounts;
mod commands;
mod currency;
mod entries;
mod error;
mod ops;
mod snapshots;
mod transactions;
mod util;

type ResultLedger<T> = Result<T, LedgerError>;
