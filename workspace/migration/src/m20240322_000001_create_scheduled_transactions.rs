use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScheduledTransactions::Table)
                    .if_not_exists()
                    .col(pk_auto(ScheduledTransactions::Id))
                    .col(integer(ScheduledTransactions::AccountId))
                    .col(integer_null(ScheduledTransactions::CategoryId))
                    .col(string(ScheduledTransactions::Kind).string_len(10))
                    .col(decimal(ScheduledTransactions::Amount).decimal_len(16, 4))
                    .col(string(ScheduledTransactions::CurrencyCode))
                    .col(date(ScheduledTransactions::DueDate))
                    .col(string_len_null(ScheduledTransactions::Frequency, 10))
                    .col(date_null(ScheduledTransactions::EndDate))
                    .col(boolean(ScheduledTransactions::IsRecurring).default(false))
                    .col(string(ScheduledTransactions::Status).string_len(10))
                    .col(date_time_null(ScheduledTransactions::CompletedAt))
                    .col(string_null(ScheduledTransactions::Description))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_transaction_account")
                            .from(
                                ScheduledTransactions::Table,
                                ScheduledTransactions::AccountId,
                            )
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_transaction_category")
                            .from(
                                ScheduledTransactions::Table,
                                ScheduledTransactions::CategoryId,
                            )
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduledTransactions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ScheduledTransactions {
    Table,
    Id,
    AccountId,
    CategoryId,
    Kind,
    Amount,
    CurrencyCode,
    DueDate,
    Frequency,
    EndDate,
    IsRecurring,
    Status,
    CompletedAt,
    Description,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}
