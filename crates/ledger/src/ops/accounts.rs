//! Account resolution and balance reads.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, SqlErr, Statement, prelude::*};

use crate::{Account, AccountRef, Direction, LedgerError, ResultLedger, accounts, snapshots};

use super::Ledger;

/// Fold all entries for one account into a balance (credits minus debits).
///
/// This is the authoritative definition of a balance; snapshots are a cache
/// of this value.
pub(crate) async fn summed_balance<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
) -> ResultLedger<i64> {
    let backend = conn.get_database_backend();
    let stmt = Statement::from_sql_and_values(
        backend,
        "SELECT COALESCE(SUM(CASE WHEN direction = ? THEN amount_minor ELSE -amount_minor END), 0) AS balance \
         FROM entries \
         WHERE account_id = ?",
        vec![Direction::Credit.as_str().into(), account_id.into()],
    );
    let row = conn.query_one(stmt).await?;
    Ok(row.and_then(|r| r.try_get("", "balance").ok()).unwrap_or(0))
}

impl Ledger {
    pub(crate) async fn find_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        reference: &AccountRef,
    ) -> ResultLedger<Option<Account>> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(reference.owner_id.clone()))
            .filter(accounts::Column::Kind.eq(reference.kind.as_str()))
            .filter(accounts::Column::Currency.eq(reference.currency.code()))
            .one(conn)
            .await?;
        model.map(Account::try_from).transpose()
    }

    /// Resolve an account by its `(owner, kind, currency)` triple, creating
    /// it on first use.
    ///
    /// Two postings may race on first use of the same triple; the loser of
    /// the unique-index race re-reads the winner's row instead of failing.
    pub(crate) async fn resolve_or_create_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        reference: &AccountRef,
        now: DateTime<Utc>,
    ) -> ResultLedger<Account> {
        if let Some(account) = self.find_account(conn, reference).await? {
            return Ok(account);
        }

        let account = Account::new(reference, now);
        match accounts::ActiveModel::from(&account).insert(conn).await {
            Ok(_) => Ok(account),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => self
                .find_account(conn, reference)
                .await?
                .ok_or_else(|| LedgerError::KeyNotFound("account not exists".to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Current balance for an account, read from its snapshot.
    ///
    /// An account that has never been posted to reports a balance of 0, in
    /// line with lazy account creation.
    pub async fn balance(&self, reference: &AccountRef) -> ResultLedger<i64> {
        let Some(account) = self.find_account(&self.database, reference).await? else {
            return Ok(0);
        };

        let snapshot = snapshots::Entity::find_by_id(account.id.to_string())
            .one(&self.database)
            .await?;
        Ok(snapshot.map(|s| s.balance_minor).unwrap_or(0))
    }

    /// Balance recomputed from the full entry history, bypassing the
    /// snapshot. Used for audits and reconciliation checks.
    pub async fn replayed_balance(&self, reference: &AccountRef) -> ResultLedger<i64> {
        let Some(account) = self.find_account(&self.database, reference).await? else {
            return Ok(0);
        };
        summed_balance(&self.database, &account.id.to_string()).await
    }
}
