use std::sync::Arc;

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use model::entities::{
    scheduled_transaction,
    scheduled_transaction::{Frequency, ScheduleStatus},
    transaction,
    transaction::TransactionKind,
};
use tracing::{debug, instrument};

use crate::error::{LedgerError, Result};
use crate::store::{BalanceDelta, LedgerStore, LedgerUnit, NewScheduled, NewTransaction};

/// The next due date after `date` for the given frequency.
///
/// Month and year steps are calendar-aware and clamp the day-of-month, so a
/// Jan 31 item advances to Feb 29 (leap) or Feb 28 rather than spilling into
/// March.
pub fn advance(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::days(7),
        // checked_add_months only fails at the end of the representable
        // calendar, far outside any usable due date.
        Frequency::Monthly => date.checked_add_months(Months::new(1)).unwrap_or(date),
        Frequency::Yearly => date.checked_add_months(Months::new(12)).unwrap_or(date),
    }
}

/// Reject a recurring item that has no frequency to recur on. Applied at
/// creation and update time, before anything touches the ledger.
pub fn validate_recurrence(is_recurring: bool, frequency: Option<Frequency>) -> Result<()> {
    if is_recurring && frequency.is_none() {
        return Err(LedgerError::RecurringRequiresFrequency);
    }
    Ok(())
}

/// What executing a scheduled transaction produced.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The realized ledger transaction.
    pub transaction: transaction::Model,
    /// The executed item, now Completed.
    pub completed: scheduled_transaction::Model,
    /// The spawned next occurrence, when one was due.
    pub next: Option<scheduled_transaction::Model>,
}

/// Owns the scheduled-transaction state machine:
/// Pending -> {Completed, Cancelled}, Pending -> Overdue (derived,
/// reversible), Overdue -> {Completed, Cancelled}. Completed and Cancelled
/// are terminal.
#[derive(Clone)]
pub struct ScheduleLifecycle {
    store: Arc<dyn LedgerStore>,
}

impl ScheduleLifecycle {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Realize a due scheduled transaction in the ledger.
    ///
    /// One atomic unit: the mirroring transaction, the account balance delta
    /// (positive for Income, negative otherwise), the Completed flip, and,
    /// for recurring items, the successor occurrence when it is still inside
    /// `end_date`.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        user_id: i32,
        id: i32,
        execute_date: Option<NaiveDateTime>,
        create_recurring: bool,
        now: NaiveDateTime,
    ) -> Result<ExecutionOutcome> {
        let item = self.store.scheduled(id, user_id).await?;

        match item.status {
            ScheduleStatus::Completed => return Err(LedgerError::AlreadyExecuted(id)),
            ScheduleStatus::Cancelled => {
                return Err(LedgerError::ScheduledTransactionCancelled(id))
            }
            ScheduleStatus::Pending | ScheduleStatus::Overdue => {}
        }

        let executed_at = execute_date.unwrap_or(now);
        let delta = match item.kind {
            TransactionKind::Income => item.amount,
            TransactionKind::Expense | TransactionKind::Transfer => -item.amount,
        };

        let mut unit = LedgerUnit {
            balance_deltas: vec![BalanceDelta::account(item.account_id, delta)],
            transactions: vec![NewTransaction {
                account_id: item.account_id,
                card_id: None,
                category_id: item.category_id,
                kind: item.kind,
                amount: item.amount,
                currency_code: item.currency_code.clone(),
                date: executed_at,
                description: item.description.clone(),
            }],
            complete_scheduled: Some((item.id, executed_at)),
            ..Default::default()
        };

        if item.is_recurring && create_recurring {
            if let Some(frequency) = item.frequency {
                let next_due = advance(item.due_date, frequency);
                let within_end = item.end_date.is_none_or(|end| next_due <= end);
                if within_end {
                    unit.new_scheduled = Some(NewScheduled {
                        account_id: item.account_id,
                        category_id: item.category_id,
                        kind: item.kind,
                        amount: item.amount,
                        currency_code: item.currency_code.clone(),
                        due_date: next_due,
                        frequency: item.frequency,
                        end_date: item.end_date,
                        is_recurring: true,
                        reminder_days: item.reminder_days,
                        description: item.description.clone(),
                    });
                } else {
                    debug!(id, %next_due, "recurrence ended, no successor");
                }
            }
        }

        let committed = self.store.commit(unit).await?;

        let transaction = committed.transactions.into_iter().next().ok_or_else(|| {
            LedgerError::Unavailable(sea_orm::DbErr::Custom(
                "committed execution unit is missing its transaction".to_string(),
            ))
        })?;
        let completed = committed.completed_scheduled.ok_or_else(|| {
            LedgerError::Unavailable(sea_orm::DbErr::Custom(
                "committed execution unit is missing the completed item".to_string(),
            ))
        })?;

        Ok(ExecutionOutcome {
            transaction,
            completed,
            next: committed.new_scheduled,
        })
    }

    /// Cancel a pending or overdue item. Terminal states are rejected.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: i32, id: i32) -> Result<scheduled_transaction::Model> {
        let item = self.store.scheduled(id, user_id).await?;

        match item.status {
            ScheduleStatus::Completed => return Err(LedgerError::AlreadyExecuted(id)),
            ScheduleStatus::Cancelled => {
                return Err(LedgerError::ScheduledTransactionCancelled(id))
            }
            ScheduleStatus::Pending | ScheduleStatus::Overdue => {}
        }

        let unit = LedgerUnit {
            cancel_scheduled: Some(id),
            ..Default::default()
        };
        let committed = self.store.commit(unit).await?;
        committed.cancelled_scheduled.ok_or_else(|| {
            LedgerError::Unavailable(sea_orm::DbErr::Custom(
                "committed cancel unit is missing the cancelled item".to_string(),
            ))
        })
    }

    /// Batch-flag overdue items. Idempotent; external schedulers call this
    /// on every tick and readers may call it before listing.
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<u64> {
        self.store.mark_overdue(today).await
    }

    /// Pending items due within their reminder window. Read-only; delivery
    /// of the reminders themselves is someone else's problem.
    pub async fn upcoming_reminders(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<scheduled_transaction::Model>> {
        self.store.due_for_reminder(today).await
    }
}
