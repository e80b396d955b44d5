pub use sea_orm_migration::prelude::*;

mod m20260301_120000_accounts;
mod m20260301_121500_ledger;
mod m20260301_123000_balance_snapshots;
mod m20260322_090000_payments;
mod m20260322_091500_webhook_events;
mod m20260410_100000_idempotency_key;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_120000_accounts::Migration),
            Box::new(m20260301_121500_ledger::Migration),
            Box::new(m20260301_123000_balance_snapshots::Migration),
            Box::new(m20260322_090000_payments::Migration),
            Box::new(m20260322_091500_webhook_events::Migration),
            Box::new(m20260410_100000_idempotency_key::Migration),
        ]
    }
}
