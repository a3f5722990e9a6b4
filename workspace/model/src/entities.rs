//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the card ledger here: accounts, cards,
//! realized transactions, auto-transfers, and scheduled transactions.

pub mod account;
pub mod auto_transfer;
pub mod card;
pub mod category;
pub mod scheduled_transaction;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::auto_transfer::Entity as AutoTransfer;
    pub use super::card::Entity as Card;
    pub use super::category::Entity as Category;
    pub use super::scheduled_transaction::Entity as ScheduledTransaction;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}
