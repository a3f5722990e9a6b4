use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutoTransfers::Table)
                    .if_not_exists()
                    .col(pk_auto(AutoTransfers::Id))
                    .col(integer(AutoTransfers::CardId))
                    .col(integer(AutoTransfers::FromAccountId))
                    .col(integer(AutoTransfers::ToAccountId))
                    .col(decimal(AutoTransfers::Amount).decimal_len(16, 4))
                    .col(string(AutoTransfers::CurrencyCode))
                    .col(string(AutoTransfers::Status).string_len(10))
                    .col(string(AutoTransfers::TriggeredBy).string_len(12))
                    .col(date_time(AutoTransfers::CreatedAt))
                    .col(date_time_null(AutoTransfers::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auto_transfer_card")
                            .from(AutoTransfers::Table, AutoTransfers::CardId)
                            .to(Cards::Table, Cards::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auto_transfer_from_account")
                            .from(AutoTransfers::Table, AutoTransfers::FromAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auto_transfer_to_account")
                            .from(AutoTransfers::Table, AutoTransfers::ToAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutoTransfers::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum AutoTransfers {
    Table,
    Id,
    CardId,
    FromAccountId,
    ToAccountId,
    Amount,
    CurrencyCode,
    Status,
    TriggeredBy,
    CreatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Cards {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}
