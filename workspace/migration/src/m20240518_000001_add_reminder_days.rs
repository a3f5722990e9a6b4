use crate::entity_iden::EntityIden;
use model::entities::prelude::*;
use model::entities::scheduled_transaction;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Add reminder_days column to scheduled_transactions table.
        // Existing rows get 0, i.e. reminders only on the due date itself.
        manager
            .alter_table(
                Table::alter()
                    .table(ScheduledTransaction::table())
                    .add_column(
                        ColumnDef::new(ScheduledTransaction::column(
                            scheduled_transaction::Column::ReminderDays,
                        ))
                        .integer()
                        .not_null()
                        .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(ScheduledTransaction::table())
                    .drop_column(ScheduledTransaction::column(
                        scheduled_transaction::Column::ReminderDays,
                    ))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
