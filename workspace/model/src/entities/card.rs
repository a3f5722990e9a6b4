use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{account, user};

/// The payment policy a card follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CardType {
    #[sea_orm(string_value = "Credit")]
    Credit,
    #[sea_orm(string_value = "Debit")]
    Debit,
    #[sea_orm(string_value = "Prepaid")]
    Prepaid,
    #[sea_orm(string_value = "Postpay")]
    Postpay,
}

/// Represents a payment card tied to a settlement account.
///
/// The type-specific attribute columns are nullable; rows must only fill the
/// subset their `card_type` uses. `ledger::card::CardTerms` converts a row
/// into a tagged union and rejects rows that violate that rule, so policy
/// code never checks field presence itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// The user who owns this card.
    pub owner_id: i32,
    /// The account the card draws from or deposits into (settlement account).
    pub account_id: i32,
    pub card_type: CardType,
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    /// Credit only: monthly spending ceiling.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub credit_limit: Option<Decimal>,
    /// Credit only: day of month the statement closes.
    pub billing_day: Option<i32>,
    /// Credit only: day of month the statement is paid.
    pub payment_day: Option<i32>,
    /// Debit only: account auto-transfers draw from.
    pub linked_account_id: Option<i32>,
    /// Debit only: whether a shortfall triggers an auto-transfer.
    pub auto_transfer_enabled: Option<bool>,
    /// Debit only: balance floor restored by auto-transfers.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub min_balance: Option<Decimal>,
    /// Debit and Prepaid: the card's own spendable balance.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub balance: Option<Decimal>,
    /// Postpay only: monthly spending ceiling.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub monthly_limit: Option<Decimal>,
    /// Postpay only: day of month usage settles.
    pub settlement_day: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::OwnerId",
        to = "user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::AccountId",
        to = "account::Column::Id",
        on_delete = "Cascade"
    )]
    SettlementAccount,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::LinkedAccountId",
        to = "account::Column::Id",
        on_delete = "SetNull"
    )]
    LinkedAccount,
    #[sea_orm(has_many = "super::auto_transfer::Entity")]
    AutoTransfer,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::auto_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AutoTransfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
