use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string(Categories::Name).unique_key())
                    .col(string_null(Categories::Description))
                    .to_owned(),
            )
            .await?;

        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(string(Accounts::Name))
                    .col(string_null(Accounts::Description))
                    .col(string(Accounts::CurrencyCode))
                    .col(integer(Accounts::OwnerId))
                    .col(decimal(Accounts::Balance).decimal_len(16, 4))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_owner")
                            .from(Accounts::Table, Accounts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create cards table. The type-specific attribute columns are all
        // nullable; each row fills only the subset its card_type uses.
        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(pk_auto(Cards::Id))
                    .col(string(Cards::Name))
                    .col(integer(Cards::OwnerId))
                    .col(integer(Cards::AccountId))
                    .col(string(Cards::CardType).string_len(10))
                    .col(boolean(Cards::IsActive).default(true))
                    .col(decimal_null(Cards::CreditLimit).decimal_len(16, 4))
                    .col(integer_null(Cards::BillingDay))
                    .col(integer_null(Cards::PaymentDay))
                    .col(integer_null(Cards::LinkedAccountId))
                    .col(boolean_null(Cards::AutoTransferEnabled))
                    .col(decimal_null(Cards::MinBalance).decimal_len(16, 4))
                    .col(decimal_null(Cards::Balance).decimal_len(16, 4))
                    .col(decimal_null(Cards::MonthlyLimit).decimal_len(16, 4))
                    .col(integer_null(Cards::SettlementDay))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_owner")
                            .from(Cards::Table, Cards::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_settlement_account")
                            .from(Cards::Table, Cards::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_card_linked_account")
                            .from(Cards::Table, Cards::LinkedAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::AccountId))
                    .col(integer_null(Transactions::CardId))
                    .col(integer_null(Transactions::CategoryId))
                    .col(string(Transactions::Kind).string_len(10))
                    .col(decimal(Transactions::Amount).decimal_len(16, 4))
                    .col(string(Transactions::CurrencyCode))
                    .col(date_time(Transactions::Date))
                    .col(string_null(Transactions::Description))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_card")
                            .from(Transactions::Table, Transactions::CardId)
                            .to(Cards::Table, Cards::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_category")
                            .from(Transactions::Table, Transactions::CategoryId)
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
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

// Define identifiers for all tables

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    Description,
    CurrencyCode,
    OwnerId,
    Balance,
}

#[derive(DeriveIden)]
enum Cards {
    Table,
    Id,
    Name,
    OwnerId,
    AccountId,
    CardType,
    IsActive,
    CreditLimit,
    BillingDay,
    PaymentDay,
    LinkedAccountId,
    AutoTransferEnabled,
    MinBalance,
    Balance,
    MonthlyLimit,
    SettlementDay,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    CardId,
    CategoryId,
    Kind,
    Amount,
    CurrencyCode,
    Date,
    Description,
}
