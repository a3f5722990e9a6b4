//! In-memory [`LedgerStore`] for engine tests.
//!
//! Holds all state behind one mutex and applies a committed unit in a single
//! critical section, so tests observe the same all-or-nothing behavior the
//! database-backed store provides. `fail_next_commit` turns the next commit
//! into an injected `Unavailable` failure for fault-path tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use model::entities::{
    account, auto_transfer,
    auto_transfer::AutoTransferStatus,
    card,
    card::CardType,
    scheduled_transaction,
    scheduled_transaction::{Frequency, ScheduleStatus},
    transaction,
    transaction::TransactionKind,
};
use rust_decimal::Decimal;
use sea_orm::DbErr;

use crate::error::{LedgerError, Result};
use crate::store::{BalanceRef, CommittedUnit, LedgerStore, LedgerUnit};

#[derive(Default)]
struct MemoryState {
    accounts: Vec<account::Model>,
    cards: Vec<card::Model>,
    transactions: Vec<transaction::Model>,
    auto_transfers: Vec<auto_transfer::Model>,
    scheduled: Vec<scheduled_transaction::Model>,
    next_id: i32,
    commits: usize,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory fake of the production store.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    fail_next_commit: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail with `Unavailable` without applying
    /// anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn add_account(&self, owner_id: i32, currency_code: &str, balance: Decimal) -> i32 {
        let mut state = self.state.lock().expect("state mutex");
        let id = state.next_id();
        state.accounts.push(account::Model {
            id,
            name: format!("account-{id}"),
            description: None,
            currency_code: currency_code.to_string(),
            owner_id,
            balance,
        });
        id
    }

    fn add_card(&self, model: card::Model) -> i32 {
        let mut state = self.state.lock().expect("state mutex");
        let id = state.next_id();
        state.cards.push(card::Model { id, ..model });
        id
    }

    pub fn add_credit_card(&self, owner_id: i32, account_id: i32, credit_limit: Decimal) -> i32 {
        self.add_card(card::Model {
            id: 0,
            name: "credit".to_string(),
            owner_id,
            account_id,
            card_type: CardType::Credit,
            is_active: true,
            credit_limit: Some(credit_limit),
            billing_day: Some(25),
            payment_day: Some(10),
            linked_account_id: None,
            auto_transfer_enabled: None,
            min_balance: None,
            balance: None,
            monthly_limit: None,
            settlement_day: None,
        })
    }

    pub fn add_debit_card(
        &self,
        owner_id: i32,
        account_id: i32,
        linked_account_id: Option<i32>,
        auto_transfer_enabled: bool,
        min_balance: Decimal,
        balance: Decimal,
    ) -> i32 {
        self.add_card(card::Model {
            id: 0,
            name: "debit".to_string(),
            owner_id,
            account_id,
            card_type: CardType::Debit,
            is_active: true,
            credit_limit: None,
            billing_day: None,
            payment_day: None,
            linked_account_id,
            auto_transfer_enabled: Some(auto_transfer_enabled),
            min_balance: Some(min_balance),
            balance: Some(balance),
            monthly_limit: None,
            settlement_day: None,
        })
    }

    pub fn add_prepaid_card(&self, owner_id: i32, account_id: i32, balance: Decimal) -> i32 {
        self.add_card(card::Model {
            id: 0,
            name: "prepaid".to_string(),
            owner_id,
            account_id,
            card_type: CardType::Prepaid,
            is_active: true,
            credit_limit: None,
            billing_day: None,
            payment_day: None,
            linked_account_id: None,
            auto_transfer_enabled: None,
            min_balance: None,
            balance: Some(balance),
            monthly_limit: None,
            settlement_day: None,
        })
    }

    pub fn add_postpay_card(&self, owner_id: i32, account_id: i32, monthly_limit: Decimal) -> i32 {
        self.add_card(card::Model {
            id: 0,
            name: "postpay".to_string(),
            owner_id,
            account_id,
            card_type: CardType::Postpay,
            is_active: true,
            credit_limit: None,
            billing_day: None,
            payment_day: None,
            linked_account_id: None,
            auto_transfer_enabled: None,
            min_balance: None,
            balance: None,
            monthly_limit: Some(monthly_limit),
            settlement_day: Some(15),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_scheduled(
        &self,
        account_id: i32,
        kind: TransactionKind,
        amount: Decimal,
        due_date: NaiveDate,
        frequency: Option<Frequency>,
        end_date: Option<NaiveDate>,
        is_recurring: bool,
        reminder_days: i32,
    ) -> i32 {
        let mut state = self.state.lock().expect("state mutex");
        let id = state.next_id();
        state.scheduled.push(scheduled_transaction::Model {
            id,
            account_id,
            category_id: None,
            kind,
            amount,
            currency_code: "KRW".to_string(),
            due_date,
            frequency,
            end_date,
            is_recurring,
            status: ScheduleStatus::Pending,
            reminder_days,
            completed_at: None,
            description: None,
        });
        id
    }

    pub fn deactivate_card(&self, id: i32) {
        let mut state = self.state.lock().expect("state mutex");
        if let Some(card) = state.cards.iter_mut().find(|c| c.id == id) {
            card.is_active = false;
        }
    }

    pub fn account_balance(&self, id: i32) -> Decimal {
        let state = self.state.lock().expect("state mutex");
        state
            .accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn card_balance(&self, id: i32) -> Decimal {
        let state = self.state.lock().expect("state mutex");
        state
            .cards
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn transactions(&self) -> Vec<transaction::Model> {
        self.state.lock().expect("state mutex").transactions.clone()
    }

    pub fn auto_transfers(&self) -> Vec<auto_transfer::Model> {
        self.state.lock().expect("state mutex").auto_transfers.clone()
    }

    pub fn scheduled_status(&self, id: i32) -> ScheduleStatus {
        self.state
            .lock()
            .expect("state mutex")
            .scheduled
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.status)
            .unwrap_or(ScheduleStatus::Cancelled)
    }

    /// Number of successfully committed units.
    pub fn commit_count(&self) -> usize {
        self.state.lock().expect("state mutex").commits
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn account(&self, id: i32, user_id: i32) -> Result<account::Model> {
        let state = self.state.lock().expect("state mutex");
        state
            .accounts
            .iter()
            .find(|a| a.id == id && a.owner_id == user_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn card(&self, id: i32, user_id: i32) -> Result<card::Model> {
        let state = self.state.lock().expect("state mutex");
        state
            .cards
            .iter()
            .find(|c| c.id == id && c.owner_id == user_id)
            .cloned()
            .ok_or(LedgerError::CardNotFound(id))
    }

    async fn scheduled(&self, id: i32, user_id: i32) -> Result<scheduled_transaction::Model> {
        let state = self.state.lock().expect("state mutex");
        let item = state
            .scheduled
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(LedgerError::ScheduledTransactionNotFound(id))?;
        let owned = state
            .accounts
            .iter()
            .any(|a| a.id == item.account_id && a.owner_id == user_id);
        if !owned {
            return Err(LedgerError::ScheduledTransactionNotFound(id));
        }
        Ok(item)
    }

    async fn monthly_expense(
        &self,
        card_id: i32,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Decimal> {
        let state = self.state.lock().expect("state mutex");
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.card_id == Some(card_id))
            .filter(|t| t.kind == TransactionKind::Expense)
            .filter(|t| t.date >= since && t.date <= until)
            .map(|t| t.amount)
            .sum())
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64> {
        let mut state = self.state.lock().expect("state mutex");
        let mut flipped = 0;
        for item in state
            .scheduled
            .iter_mut()
            .filter(|s| s.status == ScheduleStatus::Pending && s.due_date < today)
        {
            item.status = ScheduleStatus::Overdue;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn due_for_reminder(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<scheduled_transaction::Model>> {
        let state = self.state.lock().expect("state mutex");
        Ok(state
            .scheduled
            .iter()
            .filter(|s| s.status == ScheduleStatus::Pending)
            .filter(|s| s.due_date >= today)
            .filter(|s| (s.due_date - today).num_days() <= i64::from(s.reminder_days))
            .cloned()
            .collect())
    }

    async fn commit(&self, unit: LedgerUnit) -> Result<CommittedUnit> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(DbErr::Custom(
                "injected commit failure".to_string(),
            )));
        }

        let mut state = self.state.lock().expect("state mutex");
        let mut committed = CommittedUnit::default();

        for delta in &unit.balance_deltas {
            match delta.target {
                BalanceRef::Account(id) => {
                    let account = state
                        .accounts
                        .iter_mut()
                        .find(|a| a.id == id)
                        .ok_or(LedgerError::AccountNotFound(id))?;
                    account.balance += delta.delta;
                }
                BalanceRef::Card(id) => {
                    let card = state
                        .cards
                        .iter_mut()
                        .find(|c| c.id == id)
                        .ok_or(LedgerError::CardNotFound(id))?;
                    card.balance = Some(card.balance.unwrap_or(Decimal::ZERO) + delta.delta);
                }
            }
        }

        for new in unit.transactions {
            let id = state.next_id();
            let model = transaction::Model {
                id,
                account_id: new.account_id,
                card_id: new.card_id,
                category_id: new.category_id,
                kind: new.kind,
                amount: new.amount,
                currency_code: new.currency_code,
                date: new.date,
                description: new.description,
            };
            state.transactions.push(model.clone());
            committed.transactions.push(model);
        }

        if let Some(new) = unit.auto_transfer {
            let id = state.next_id();
            let model = auto_transfer::Model {
                id,
                card_id: new.card_id,
                from_account_id: new.from_account_id,
                to_account_id: new.to_account_id,
                amount: new.amount,
                currency_code: new.currency_code,
                status: AutoTransferStatus::Completed,
                triggered_by: new.triggered_by,
                created_at: new.created_at,
                completed_at: Some(new.created_at),
            };
            state.auto_transfers.push(model.clone());
            committed.auto_transfer = Some(model);
        }

        if let Some((id, completed_at)) = unit.complete_scheduled {
            let item = state
                .scheduled
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(LedgerError::ScheduledTransactionNotFound(id))?;
            item.status = ScheduleStatus::Completed;
            item.completed_at = Some(completed_at);
            committed.completed_scheduled = Some(item.clone());
        }

        if let Some(id) = unit.cancel_scheduled {
            let item = state
                .scheduled
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(LedgerError::ScheduledTransactionNotFound(id))?;
            item.status = ScheduleStatus::Cancelled;
            committed.cancelled_scheduled = Some(item.clone());
        }

        if let Some(new) = unit.new_scheduled {
            let id = state.next_id();
            let model = scheduled_transaction::Model {
                id,
                account_id: new.account_id,
                category_id: new.category_id,
                kind: new.kind,
                amount: new.amount,
                currency_code: new.currency_code,
                due_date: new.due_date,
                frequency: new.frequency,
                end_date: new.end_date,
                is_recurring: new.is_recurring,
                status: ScheduleStatus::Pending,
                reminder_days: new.reminder_days,
                completed_at: None,
                description: new.description,
            };
            state.scheduled.push(model.clone());
            committed.new_scheduled = Some(model);
        }

        state.commits += 1;
        Ok(committed)
    }
}
