use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use model::entities::{
    account, auto_transfer,
    auto_transfer::{AutoTransferStatus, TransferTrigger},
    card, scheduled_transaction,
    scheduled_transaction::{Frequency, ScheduleStatus},
    transaction,
    transaction::TransactionKind,
};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, TransactionError, TransactionTrait,
};
use tracing::{debug, instrument};

use crate::error::{LedgerError, Result};

/// A balance mutation target: an account row or a card's own balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRef {
    Account(i32),
    Card(i32),
}

/// One signed balance mutation inside a unit of work.
#[derive(Debug, Clone)]
pub struct BalanceDelta {
    pub target: BalanceRef,
    pub delta: Decimal,
}

impl BalanceDelta {
    pub fn account(id: i32, delta: Decimal) -> Self {
        Self {
            target: BalanceRef::Account(id),
            delta,
        }
    }

    pub fn card(id: i32, delta: Decimal) -> Self {
        Self {
            target: BalanceRef::Card(id),
            delta,
        }
    }
}

/// A transaction row to insert as part of a unit of work.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i32,
    pub card_id: Option<i32>,
    pub category_id: Option<i32>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency_code: String,
    pub date: NaiveDateTime,
    pub description: Option<String>,
}

/// An auto-transfer audit row to insert. The store writes it Completed with
/// `completed_at = created_at`; a Pending row can only exist if the commit
/// itself was interrupted.
#[derive(Debug, Clone)]
pub struct NewAutoTransfer {
    pub card_id: i32,
    pub from_account_id: i32,
    pub to_account_id: i32,
    pub amount: Decimal,
    pub currency_code: String,
    pub triggered_by: TransferTrigger,
    pub created_at: NaiveDateTime,
}

/// A successor scheduled transaction to insert.
#[derive(Debug, Clone)]
pub struct NewScheduled {
    pub account_id: i32,
    pub category_id: Option<i32>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency_code: String,
    pub due_date: NaiveDate,
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub reminder_days: i32,
    pub description: Option<String>,
}

/// One atomic unit of work against the ledger.
///
/// Engine code plans a unit in memory, then submits it through
/// [`LedgerStore::commit`] exactly once per public operation. The store
/// applies everything inside one database transaction; either all of it
/// becomes visible or none of it does.
#[derive(Debug, Clone, Default)]
pub struct LedgerUnit {
    pub balance_deltas: Vec<BalanceDelta>,
    pub transactions: Vec<NewTransaction>,
    pub auto_transfer: Option<NewAutoTransfer>,
    /// Scheduled item to flip to Completed, with its completion timestamp.
    pub complete_scheduled: Option<(i32, NaiveDateTime)>,
    /// Scheduled item to flip to Cancelled.
    pub cancel_scheduled: Option<i32>,
    pub new_scheduled: Option<NewScheduled>,
}

/// What a committed unit produced, with database-assigned ids.
#[derive(Debug, Clone, Default)]
pub struct CommittedUnit {
    pub transactions: Vec<transaction::Model>,
    pub auto_transfer: Option<auto_transfer::Model>,
    pub completed_scheduled: Option<scheduled_transaction::Model>,
    pub cancelled_scheduled: Option<scheduled_transaction::Model>,
    pub new_scheduled: Option<scheduled_transaction::Model>,
}

/// The engine's only door to persistent state.
///
/// Reads are ownership-checked: an entity that exists but belongs to another
/// user is reported as absent, so cross-user references die before any
/// mutation is planned. All writes go through [`Self::commit`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account(&self, id: i32, user_id: i32) -> Result<account::Model>;

    async fn card(&self, id: i32, user_id: i32) -> Result<card::Model>;

    async fn scheduled(&self, id: i32, user_id: i32) -> Result<scheduled_transaction::Model>;

    /// Sum of Expense transactions charged to the card in `[since, until]`.
    async fn monthly_expense(
        &self,
        card_id: i32,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Decimal>;

    /// Flip every Pending scheduled transaction with `due_date < today` to
    /// Overdue. Idempotent; safe to run on every read.
    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64>;

    /// Pending scheduled transactions whose due date falls within their own
    /// `reminder_days` window of `today`. Read-only projection.
    async fn due_for_reminder(&self, today: NaiveDate)
        -> Result<Vec<scheduled_transaction::Model>>;

    /// Apply one unit of work atomically.
    async fn commit(&self, unit: LedgerUnit) -> Result<CommittedUnit>;
}

/// Production [`LedgerStore`] backed by a SeaORM connection. Commit runs the
/// whole unit inside a single database transaction.
#[derive(Debug, Clone)]
pub struct DbLedgerStore {
    db: DatabaseConnection,
}

impl DbLedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn apply_delta(txn: &DatabaseTransaction, delta: &BalanceDelta) -> std::result::Result<(), DbErr> {
    match delta.target {
        BalanceRef::Account(id) => {
            let row = account::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("account {id}")))?;
            let balance = row.balance + delta.delta;
            let mut active: account::ActiveModel = row.into();
            active.balance = Set(balance);
            active.update(txn).await?;
        }
        BalanceRef::Card(id) => {
            let row = card::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("card {id}")))?;
            let balance = row.balance.unwrap_or(Decimal::ZERO) + delta.delta;
            let mut active: card::ActiveModel = row.into();
            active.balance = Set(Some(balance));
            active.update(txn).await?;
        }
    }
    Ok(())
}

async fn apply_unit(
    txn: &DatabaseTransaction,
    unit: LedgerUnit,
) -> std::result::Result<CommittedUnit, DbErr> {
    let mut committed = CommittedUnit::default();

    for delta in &unit.balance_deltas {
        apply_delta(txn, delta).await?;
    }

    for new in unit.transactions {
        let inserted = transaction::ActiveModel {
            account_id: Set(new.account_id),
            card_id: Set(new.card_id),
            category_id: Set(new.category_id),
            kind: Set(new.kind),
            amount: Set(new.amount),
            currency_code: Set(new.currency_code),
            date: Set(new.date),
            description: Set(new.description),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        committed.transactions.push(inserted);
    }

    if let Some(new) = unit.auto_transfer {
        let inserted = auto_transfer::ActiveModel {
            card_id: Set(new.card_id),
            from_account_id: Set(new.from_account_id),
            to_account_id: Set(new.to_account_id),
            amount: Set(new.amount),
            currency_code: Set(new.currency_code),
            status: Set(AutoTransferStatus::Completed),
            triggered_by: Set(new.triggered_by),
            created_at: Set(new.created_at),
            completed_at: Set(Some(new.created_at)),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        committed.auto_transfer = Some(inserted);
    }

    if let Some((id, completed_at)) = unit.complete_scheduled {
        let row = scheduled_transaction::Entity::find_by_id(id)
            .one(txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("scheduled transaction {id}")))?;
        let mut active: scheduled_transaction::ActiveModel = row.into();
        active.status = Set(ScheduleStatus::Completed);
        active.completed_at = Set(Some(completed_at));
        committed.completed_scheduled = Some(active.update(txn).await?);
    }

    if let Some(id) = unit.cancel_scheduled {
        let row = scheduled_transaction::Entity::find_by_id(id)
            .one(txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("scheduled transaction {id}")))?;
        let mut active: scheduled_transaction::ActiveModel = row.into();
        active.status = Set(ScheduleStatus::Cancelled);
        committed.cancelled_scheduled = Some(active.update(txn).await?);
    }

    if let Some(new) = unit.new_scheduled {
        let inserted = scheduled_transaction::ActiveModel {
            account_id: Set(new.account_id),
            category_id: Set(new.category_id),
            kind: Set(new.kind),
            amount: Set(new.amount),
            currency_code: Set(new.currency_code),
            due_date: Set(new.due_date),
            frequency: Set(new.frequency),
            end_date: Set(new.end_date),
            is_recurring: Set(new.is_recurring),
            status: Set(ScheduleStatus::Pending),
            reminder_days: Set(new.reminder_days),
            completed_at: Set(None),
            description: Set(new.description),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        committed.new_scheduled = Some(inserted);
    }

    Ok(committed)
}

#[async_trait]
impl LedgerStore for DbLedgerStore {
    async fn account(&self, id: i32, user_id: i32) -> Result<account::Model> {
        account::Entity::find_by_id(id)
            .filter(account::Column::OwnerId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn card(&self, id: i32, user_id: i32) -> Result<card::Model> {
        card::Entity::find_by_id(id)
            .filter(card::Column::OwnerId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(LedgerError::CardNotFound(id))
    }

    async fn scheduled(&self, id: i32, user_id: i32) -> Result<scheduled_transaction::Model> {
        let row = scheduled_transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::ScheduledTransactionNotFound(id))?;

        // Ownership runs through the account the item posts to.
        let owned = account::Entity::find_by_id(row.account_id)
            .filter(account::Column::OwnerId.eq(user_id))
            .one(&self.db)
            .await?
            .is_some();
        if !owned {
            return Err(LedgerError::ScheduledTransactionNotFound(id));
        }
        Ok(row)
    }

    async fn monthly_expense(
        &self,
        card_id: i32,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Decimal> {
        let rows = transaction::Entity::find()
            .filter(transaction::Column::CardId.eq(card_id))
            .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
            .filter(transaction::Column::Date.gte(since))
            .filter(transaction::Column::Date.lte(until))
            .all(&self.db)
            .await?;

        // Summed in Rust so the decimal column never degrades to a float.
        Ok(rows.iter().map(|t| t.amount).sum())
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64> {
        let result = scheduled_transaction::Entity::update_many()
            .col_expr(
                scheduled_transaction::Column::Status,
                Expr::value(ScheduleStatus::Overdue),
            )
            .filter(scheduled_transaction::Column::Status.eq(ScheduleStatus::Pending))
            .filter(scheduled_transaction::Column::DueDate.lt(today))
            .exec(&self.db)
            .await?;
        if result.rows_affected > 0 {
            debug!(rows = result.rows_affected, "marked scheduled transactions overdue");
        }
        Ok(result.rows_affected)
    }

    async fn due_for_reminder(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<scheduled_transaction::Model>> {
        let rows = scheduled_transaction::Entity::find()
            .filter(scheduled_transaction::Column::Status.eq(ScheduleStatus::Pending))
            .filter(scheduled_transaction::Column::DueDate.gte(today))
            .all(&self.db)
            .await?;

        // The window length is per row, so the final cut happens here.
        Ok(rows
            .into_iter()
            .filter(|s| (s.due_date - today).num_days() <= i64::from(s.reminder_days))
            .collect())
    }

    #[instrument(skip(self, unit), fields(
        deltas = unit.balance_deltas.len(),
        transactions = unit.transactions.len(),
    ))]
    async fn commit(&self, unit: LedgerUnit) -> Result<CommittedUnit> {
        let outcome = self
            .db
            .transaction::<_, CommittedUnit, DbErr>(|txn| Box::pin(apply_unit(txn, unit)))
            .await;

        match outcome {
            Ok(committed) => Ok(committed),
            Err(TransactionError::Connection(e)) => Err(LedgerError::Unavailable(e)),
            Err(TransactionError::Transaction(e)) => Err(LedgerError::Unavailable(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use model::entities::card::CardType;
    use sea_orm::{Database, Set};

    async fn setup() -> (DbLedgerStore, i32, i32) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let user = model::entities::user::ActiveModel {
            username: Set("owner".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let account = account::ActiveModel {
            name: Set("Checking".to_string()),
            currency_code: Set("USD".to_string()),
            owner_id: Set(user.id),
            balance: Set(Decimal::from(1000)),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        (DbLedgerStore::new(db), user.id, account.id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn datetime(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_reads_are_ownership_scoped() {
        let (store, user_id, account_id) = setup().await;

        assert!(store.account(account_id, user_id).await.is_ok());

        let err = store.account(account_id, user_id + 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));

        let err = store.card(999, user_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::CardNotFound(999)));
    }

    #[tokio::test]
    async fn test_commit_applies_whole_unit() {
        let (store, user_id, account_id) = setup().await;

        let unit = LedgerUnit {
            balance_deltas: vec![BalanceDelta::account(account_id, Decimal::from(-250))],
            transactions: vec![NewTransaction {
                account_id,
                card_id: None,
                category_id: None,
                kind: TransactionKind::Expense,
                amount: Decimal::from(250),
                currency_code: "USD".to_string(),
                date: datetime(2024, 6, 1),
                description: Some("groceries".to_string()),
            }],
            ..Default::default()
        };

        let committed = store.commit(unit).await.unwrap();
        assert_eq!(committed.transactions.len(), 1);
        assert_eq!(committed.transactions[0].amount, Decimal::from(250));

        let account = store.account(account_id, user_id).await.unwrap();
        assert_eq!(account.balance, Decimal::from(750));
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_missing_row() {
        let (store, user_id, account_id) = setup().await;

        // A delta against a nonexistent account aborts the whole unit,
        // including the otherwise-valid delta ahead of it.
        let unit = LedgerUnit {
            balance_deltas: vec![
                BalanceDelta::account(account_id, Decimal::from(-100)),
                BalanceDelta::account(9999, Decimal::from(100)),
            ],
            ..Default::default()
        };

        let err = store.commit(unit).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));

        let account = store.account(account_id, user_id).await.unwrap();
        assert_eq!(account.balance, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_monthly_expense_window() {
        let (store, _user_id, account_id) = setup().await;

        let card = card::ActiveModel {
            name: Set("Visa".to_string()),
            owner_id: Set(1),
            account_id: Set(account_id),
            card_type: Set(CardType::Credit),
            is_active: Set(true),
            credit_limit: Set(Some(Decimal::from(10_000))),
            ..Default::default()
        }
        .insert(&store.db)
        .await
        .unwrap();

        for (day, amount) in [(1, 100), (15, 50)] {
            let unit = LedgerUnit {
                transactions: vec![NewTransaction {
                    account_id,
                    card_id: Some(card.id),
                    category_id: None,
                    kind: TransactionKind::Expense,
                    amount: Decimal::from(amount),
                    currency_code: "USD".to_string(),
                    date: datetime(2024, 6, day),
                    description: None,
                }],
                ..Default::default()
            };
            store.commit(unit).await.unwrap();
        }

        // One expense from the previous month stays out of the sum.
        let unit = LedgerUnit {
            transactions: vec![NewTransaction {
                account_id,
                card_id: Some(card.id),
                category_id: None,
                kind: TransactionKind::Expense,
                amount: Decimal::from(999),
                currency_code: "USD".to_string(),
                date: datetime(2024, 5, 20),
                description: None,
            }],
            ..Default::default()
        };
        store.commit(unit).await.unwrap();

        let usage = store
            .monthly_expense(card.id, datetime(2024, 6, 1), datetime(2024, 6, 30))
            .await
            .unwrap();
        assert_eq!(usage, Decimal::from(150));
    }

    #[tokio::test]
    async fn test_mark_overdue_is_idempotent() {
        let (store, _user_id, account_id) = setup().await;

        for due in [date(2024, 5, 1), date(2024, 7, 1)] {
            let unit = LedgerUnit {
                new_scheduled: Some(NewScheduled {
                    account_id,
                    category_id: None,
                    kind: TransactionKind::Expense,
                    amount: Decimal::from(10),
                    currency_code: "USD".to_string(),
                    due_date: due,
                    frequency: None,
                    end_date: None,
                    is_recurring: false,
                    reminder_days: 0,
                    description: None,
                }),
                ..Default::default()
            };
            store.commit(unit).await.unwrap();
        }

        let flipped = store.mark_overdue(date(2024, 6, 1)).await.unwrap();
        assert_eq!(flipped, 1);

        // Second pass finds nothing left to flip.
        let flipped = store.mark_overdue(date(2024, 6, 1)).await.unwrap();
        assert_eq!(flipped, 0);
    }
}
