use sea_orm_migration::prelude::*;

use crate::m20260301_120000_accounts::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum BalanceSnapshots {
    Table,
    AccountId,
    BalanceMinor,
    Currency,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BalanceSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceSnapshots::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BalanceSnapshots::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceSnapshots::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceSnapshots::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_snapshots-account_id")
                            .from(BalanceSnapshots::Table, BalanceSnapshots::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceSnapshots::Table).to_owned())
            .await?;
        Ok(())
    }
}
