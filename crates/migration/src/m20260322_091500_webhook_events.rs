use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum WebhookEvents {
    Table,
    EventId,
    EventType,
    Payload,
    Signature,
    Processed,
    ReceivedAt,
    ProcessedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebhookEvents::Table)
                    .if_not_exists()
                    // The deterministic event id is the primary key, so a
                    // concurrent duplicate delivery can never create a
                    // second row.
                    .col(
                        ColumnDef::new(WebhookEvents::EventId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebhookEvents::EventType).string().not_null())
                    .col(ColumnDef::new(WebhookEvents::Payload).text().not_null())
                    .col(ColumnDef::new(WebhookEvents::Signature).string())
                    .col(
                        ColumnDef::new(WebhookEvents::Processed)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebhookEvents::ReceivedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WebhookEvents::ProcessedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        // Replay scans look for unprocessed events.
        manager
            .create_index(
                Index::create()
                    .name("idx-webhook_events-processed")
                    .table(WebhookEvents::Table)
                    .col(WebhookEvents::Processed)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookEvents::Table).to_owned())
            .await?;
        Ok(())
    }
}
