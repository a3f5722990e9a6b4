use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{account, card};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum AutoTransferStatus {
    /// Only reachable if a commit is interrupted; the engine never leaves
    /// a transfer in this state on a normal code path.
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
pub enum TransferTrigger {
    /// Raised inline while processing a card payment that lacked funds.
    #[sea_orm(string_value = "Payment")]
    Payment,
    /// Raised by an explicit top-up request.
    #[sea_orm(string_value = "LowBalance")]
    LowBalance,
}

/// Audit record of one automatic fund movement from a debit card's linked
/// account into its settlement account. Created and completed within the
/// same atomic unit as the movement itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auto_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub card_id: i32,
    pub from_account_id: i32,
    pub to_account_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub currency_code: String,
    pub status: AutoTransferStatus,
    pub triggered_by: TransferTrigger,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "card::Entity",
        from = "Column::CardId",
        to = "card::Column::Id",
        on_delete = "Cascade"
    )]
    Card,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::FromAccountId",
        to = "account::Column::Id"
    )]
    FromAccount,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::ToAccountId",
        to = "account::Column::Id"
    )]
    ToAccount,
}

impl Related<card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
