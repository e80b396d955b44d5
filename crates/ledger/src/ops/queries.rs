//! Read-side queries over the ledger.

use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    AccountRef, BalanceSnapshot, Entry, LedgerError, LedgerTransaction, ResultLedger, entries,
    snapshots, transactions,
};

use super::Ledger;

impl Ledger {
    /// Audit read: one transaction and the two entries it owns.
    pub async fn transaction_with_entries(
        &self,
        transaction_id: Uuid,
    ) -> ResultLedger<(LedgerTransaction, Vec<Entry>)> {
        let tx_model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("transaction not exists".to_string()))?;
        let tx = LedgerTransaction::try_from(tx_model)?;

        let entry_models = entries::Entity::find()
            .filter(entries::Column::TransactionId.eq(transaction_id.to_string()))
            .order_by_asc(entries::Column::Id)
            .all(&self.database)
            .await?;
        let mut tx_entries = Vec::with_capacity(entry_models.len());
        for model in entry_models {
            tx_entries.push(Entry::try_from(model)?);
        }
        Ok((tx, tx_entries))
    }

    /// The stored snapshot for an account, if the account exists and has
    /// been posted to.
    pub async fn snapshot(&self, reference: &AccountRef) -> ResultLedger<Option<BalanceSnapshot>> {
        let Some(account) = self.find_account(&self.database, reference).await? else {
            return Ok(None);
        };
        let model = snapshots::Entity::find_by_id(account.id.to_string())
            .one(&self.database)
            .await?;
        model.map(BalanceSnapshot::try_from).transpose()
    }

    /// All entries ever posted against an account, oldest first.
    pub async fn entries_for_account(&self, reference: &AccountRef) -> ResultLedger<Vec<Entry>> {
        let Some(account) = self.find_account(&self.database, reference).await? else {
            return Ok(Vec::new());
        };
        let models = entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account.id.to_string()))
            .order_by_asc(entries::Column::CreatedAt)
            .all(&self.database)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            out.push(Entry::try_from(model)?);
        }
        Ok(out)
    }
}
