pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_table;
mod m20240322_000001_create_scheduled_transactions;
mod m20240410_000001_create_auto_transfers;
mod m20240518_000001_add_reminder_days;
pub mod entity_iden;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_table::Migration),
            Box::new(m20240322_000001_create_scheduled_transactions::Migration),
            Box::new(m20240410_000001_create_auto_transfers::Migration),
            Box::new(m20240518_000001_add_reminder_days::Migration),
        ]
    }
}
