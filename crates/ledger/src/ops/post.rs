//! The posting unit of work.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, SqlErr, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Account, ContributionCmd, Direction, Entry, LedgerError, LedgerTransaction, PostingCmd,
    RefundCmd, ResultLedger, TransactionKind, TransactionStatus, accounts, entries, snapshots,
    transactions, util::ensure_posting_currency,
};

use super::{Ledger, with_tx};

impl Ledger {
    /// Post one balanced money movement.
    ///
    /// Resolves (or lazily creates) the debit and credit accounts, writes
    /// one transaction row plus exactly two entries, and refreshes both
    /// balance snapshots, all inside a single DB transaction. Either every
    /// row is visible or none is.
    ///
    /// Posting is deduplicated by `idempotency_key` when one is supplied: a
    /// replay returns the existing transaction id without writing anything.
    pub async fn post(&self, cmd: PostingCmd) -> ResultLedger<Uuid> {
        with_tx!(self, |db_tx| {
            let id = self.post_in_tx(&db_tx, cmd).await?;
            Ok(id)
        })
    }

    /// Record a verified contribution: debit the contributor's account,
    /// credit the goal's account.
    pub async fn post_contribution(&self, cmd: ContributionCmd) -> ResultLedger<Uuid> {
        let mut posting = PostingCmd::new(
            TransactionKind::Contribution,
            cmd.amount_minor,
            cmd.currency,
            crate::AccountRef::user(cmd.user_id.clone(), cmd.currency),
            crate::AccountRef::goal(cmd.goal_id.clone(), cmd.currency),
            cmd.transaction_date,
        )
        .metadata("user_id", cmd.user_id)
        .metadata("goal_id", cmd.goal_id);

        if let Some(description) = cmd.description {
            posting = posting.description(description);
        }
        if let Some(payment_id) = cmd.payment_id {
            posting = posting
                .metadata("payment_id", payment_id.to_string())
                .idempotency_key(payment_id.to_string());
        }

        self.post(posting).await
    }

    /// Reverse a prior contribution.
    ///
    /// The original entries are left untouched; the refund is a new
    /// transaction with debit/credit roles swapped (debit the goal, credit
    /// the contributor) and the original id recorded in its metadata.
    pub async fn post_refund(&self, cmd: RefundCmd) -> ResultLedger<Uuid> {
        with_tx!(self, |db_tx| {
            let id = self.post_refund_in_tx(&db_tx, cmd).await?;
            Ok(id)
        })
    }

    async fn post_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: PostingCmd,
    ) -> ResultLedger<Uuid> {
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::InvalidPosting(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if cmd.debit == cmd.credit {
            return Err(LedgerError::InvalidPosting(
                "debit and credit accounts must differ".to_string(),
            ));
        }
        ensure_posting_currency(cmd.currency, cmd.debit.currency)?;
        ensure_posting_currency(cmd.currency, cmd.credit.currency)?;

        if let Some(key) = cmd.idempotency_key.as_deref()
            && let Some(existing) = self.find_by_idempotency_key(db_tx, cmd.kind, key).await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let debit_account = self
            .resolve_or_create_account(db_tx, &cmd.debit, now)
            .await?;
        let credit_account = self
            .resolve_or_create_account(db_tx, &cmd.credit, now)
            .await?;

        let mut tx = LedgerTransaction::new(
            cmd.kind,
            cmd.amount_minor,
            cmd.currency,
            cmd.description,
            cmd.metadata,
            cmd.idempotency_key,
            cmd.transaction_date,
        )?;
        tx.status = TransactionStatus::Completed;

        let posting_entries = vec![
            Entry::new(
                debit_account.id,
                tx.id,
                Direction::Debit,
                cmd.amount_minor,
                cmd.currency,
                now,
            )?,
            Entry::new(
                credit_account.id,
                tx.id,
                Direction::Credit,
                cmd.amount_minor,
                cmd.currency,
                now,
            )?,
        ];

        self.create_transaction_with_entries(
            db_tx,
            &tx,
            &posting_entries,
            &[debit_account, credit_account],
        )
        .await
    }

    async fn post_refund_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: RefundCmd,
    ) -> ResultLedger<Uuid> {
        let original_model = transactions::Entity::find_by_id(cmd.contribution_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("transaction not exists".to_string()))?;
        let original = LedgerTransaction::try_from(original_model)?;
        if original.kind != TransactionKind::Contribution {
            return Err(LedgerError::InvalidPosting(format!(
                "cannot refund a {} transaction",
                original.kind.as_str()
            )));
        }

        if let Some(key) = cmd.idempotency_key.as_deref()
            && let Some(existing) = self
                .find_by_idempotency_key(db_tx, TransactionKind::Refund, key)
                .await?
        {
            return Ok(existing);
        }

        let entry_models = entries::Entity::find()
            .filter(entries::Column::TransactionId.eq(original.id.to_string()))
            .all(db_tx)
            .await?;
        let mut debited_account = None;
        let mut credited_account = None;
        for model in entry_models {
            let entry = Entry::try_from(model)?;
            match entry.direction {
                Direction::Debit => debited_account = Some(entry.account_id),
                Direction::Credit => credited_account = Some(entry.account_id),
            }
        }
        let (Some(original_debit), Some(original_credit)) = (debited_account, credited_account)
        else {
            return Err(LedgerError::Unbalanced(
                "contribution is missing a debit or credit entry".to_string(),
            ));
        };

        let debit_account = self.load_account(db_tx, original_credit).await?;
        let credit_account = self.load_account(db_tx, original_debit).await?;

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("refund_of".to_string(), original.id.to_string());
        if let Some(reason) = cmd.reason.clone() {
            metadata.insert("reason".to_string(), reason);
        }

        let mut tx = LedgerTransaction::new(
            TransactionKind::Refund,
            original.amount_minor,
            original.currency,
            cmd.reason,
            metadata,
            cmd.idempotency_key,
            cmd.transaction_date,
        )?;
        tx.status = TransactionStatus::Completed;

        let now = Utc::now();
        let posting_entries = vec![
            Entry::new(
                debit_account.id,
                tx.id,
                Direction::Debit,
                original.amount_minor,
                original.currency,
                now,
            )?,
            Entry::new(
                credit_account.id,
                tx.id,
                Direction::Credit,
                original.amount_minor,
                original.currency,
                now,
            )?,
        ];

        self.create_transaction_with_entries(
            db_tx,
            &tx,
            &posting_entries,
            &[debit_account, credit_account],
        )
        .await
    }

    async fn load_account(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultLedger<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    async fn find_by_idempotency_key(
        &self,
        db_tx: &DatabaseTransaction,
        kind: TransactionKind,
        key: &str,
    ) -> ResultLedger<Option<Uuid>> {
        let existing = transactions::Entity::find()
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .filter(transactions::Column::IdempotencyKey.eq(key.to_string()))
            .one(db_tx)
            .await?;
        existing
            .map(|model| crate::util::parse_uuid(&model.id, "transaction"))
            .transpose()
    }

    /// Write a transaction plus its entries and refresh the touched
    /// snapshots. The snapshot writes are the last statements of the unit of
    /// work so they reflect everything written before them.
    pub(crate) async fn create_transaction_with_entries(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &LedgerTransaction,
        posting_entries: &[Entry],
        touched_accounts: &[Account],
    ) -> ResultLedger<Uuid> {
        validate_double_entry(tx, posting_entries)?;

        if let Err(err) = transactions::ActiveModel::from(tx).insert(db_tx).await {
            // A concurrent posting with the same idempotency key may have won
            // the unique-index race after our up-front check.
            if tx.idempotency_key.is_some()
                && matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            {
                let key = tx.idempotency_key.as_deref().unwrap_or_default();
                if let Some(existing) = self.find_by_idempotency_key(db_tx, tx.kind, key).await? {
                    return Ok(existing);
                }
            }
            return Err(err.into());
        }
        for entry in posting_entries {
            entries::ActiveModel::from(entry).insert(db_tx).await?;
        }

        for account in touched_accounts {
            self.refresh_snapshot(db_tx, account).await?;
        }

        Ok(tx.id)
    }

    /// Recompute one account's snapshot from its full entry history.
    ///
    /// Summing history instead of incrementing the previous value makes the
    /// snapshot self-healing: any prior drift is corrected by the next
    /// posting that touches the account.
    async fn refresh_snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        account: &Account,
    ) -> ResultLedger<()> {
        let balance = super::accounts::summed_balance(db_tx, &account.id.to_string()).await?;
        let now = Utc::now();

        let existing = snapshots::Entity::find_by_id(account.id.to_string())
            .one(db_tx)
            .await?;
        match existing {
            Some(_) => {
                let snapshot = snapshots::ActiveModel {
                    account_id: ActiveValue::Set(account.id.to_string()),
                    balance_minor: ActiveValue::Set(balance),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };
                snapshot.update(db_tx).await?;
            }
            None => {
                let snapshot = snapshots::ActiveModel {
                    account_id: ActiveValue::Set(account.id.to_string()),
                    balance_minor: ActiveValue::Set(balance),
                    currency: ActiveValue::Set(account.currency.code().to_string()),
                    updated_at: ActiveValue::Set(now),
                };
                snapshot.insert(db_tx).await?;
            }
        }
        Ok(())
    }
}

fn validate_double_entry(tx: &LedgerTransaction, posting_entries: &[Entry]) -> ResultLedger<()> {
    if posting_entries.len() != 2 {
        return Err(LedgerError::Unbalanced(format!(
            "expected exactly 2 entries, got {}",
            posting_entries.len()
        )));
    }
    let mut debit_total = 0i64;
    let mut credit_total = 0i64;
    for entry in posting_entries {
        if entry.transaction_id != tx.id {
            return Err(LedgerError::InvalidPosting(
                "invalid entry: transaction_id mismatch".to_string(),
            ));
        }
        if entry.amount_minor <= 0 {
            return Err(LedgerError::InvalidPosting(
                "invalid entry: amount_minor must be > 0".to_string(),
            ));
        }
        if entry.currency != tx.currency {
            return Err(LedgerError::CurrencyMismatch(format!(
                "transaction currency is {}, got {}",
                tx.currency.code(),
                entry.currency.code()
            )));
        }
        match entry.direction {
            Direction::Debit => debit_total += entry.amount_minor,
            Direction::Credit => credit_total += entry.amount_minor,
        }
    }
    if debit_total != credit_total || debit_total != tx.amount_minor {
        return Err(LedgerError::Unbalanced(format!(
            "debits ({debit_total}) and credits ({credit_total}) must both equal the transaction amount ({})",
            tx.amount_minor
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use migration::MigratorTrait;
    use sea_orm::{Database, EntityTrait, TransactionTrait};

    use crate::{
        AccountRef, Currency, Direction, Entry, LedgerError, LedgerTransaction, TransactionKind,
        TransactionStatus, entries, transactions,
    };

    use super::super::Ledger;

    async fn ledger_with_db() -> Ledger {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Ledger::builder().database(db).build()
    }

    fn completed_transaction(amount_minor: i64) -> LedgerTransaction {
        let mut tx = LedgerTransaction::new(
            TransactionKind::Contribution,
            amount_minor,
            Currency::Ngn,
            None,
            BTreeMap::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        tx.status = TransactionStatus::Completed;
        tx
    }

    #[tokio::test]
    async fn failure_after_first_entry_leaves_no_rows() {
        let ledger = ledger_with_db().await;
        let now = Utc::now();

        let db_tx = ledger.database.begin().await.unwrap();
        let debit_account = ledger
            .resolve_or_create_account(&db_tx, &AccountRef::user("u-1", Currency::Ngn), now)
            .await
            .unwrap();
        let credit_account = ledger
            .resolve_or_create_account(&db_tx, &AccountRef::goal("g-1", Currency::Ngn), now)
            .await
            .unwrap();
        db_tx.commit().await.unwrap();

        let tx = completed_transaction(5_000);
        let debit = Entry::new(
            debit_account.id,
            tx.id,
            Direction::Debit,
            5_000,
            Currency::Ngn,
            now,
        )
        .unwrap();
        // Reuse the debit entry's id so the second insert violates the
        // primary key after the first insert has already succeeded.
        let mut credit = Entry::new(
            credit_account.id,
            tx.id,
            Direction::Credit,
            5_000,
            Currency::Ngn,
            now,
        )
        .unwrap();
        credit.id = debit.id;

        let db_tx = ledger.database.begin().await.unwrap();
        let result = ledger
            .create_transaction_with_entries(
                &db_tx,
                &tx,
                &[debit, credit],
                &[debit_account, credit_account],
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Database(_))));
        drop(db_tx); // rollback

        let txs = transactions::Entity::find()
            .all(&ledger.database)
            .await
            .unwrap();
        assert!(txs.is_empty());
        let rows = entries::Entity::find()
            .all(&ledger.database)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn unbalanced_entries_are_rejected_before_any_write() {
        let ledger = ledger_with_db().await;
        let now = Utc::now();

        let db_tx = ledger.database.begin().await.unwrap();
        let debit_account = ledger
            .resolve_or_create_account(&db_tx, &AccountRef::user("u-1", Currency::Ngn), now)
            .await
            .unwrap();
        let credit_account = ledger
            .resolve_or_create_account(&db_tx, &AccountRef::goal("g-1", Currency::Ngn), now)
            .await
            .unwrap();

        let tx = completed_transaction(5_000);
        let debit = Entry::new(
            debit_account.id,
            tx.id,
            Direction::Debit,
            5_000,
            Currency::Ngn,
            now,
        )
        .unwrap();
        let credit = Entry::new(
            credit_account.id,
            tx.id,
            Direction::Credit,
            4_000,
            Currency::Ngn,
            now,
        )
        .unwrap();

        let result = ledger
            .create_transaction_with_entries(
                &db_tx,
                &tx,
                &[debit, credit],
                &[debit_account, credit_account],
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Unbalanced(_))));
        drop(db_tx);

        let txs = transactions::Entity::find()
            .all(&ledger.database)
            .await
            .unwrap();
        assert!(txs.is_empty());
    }
}
