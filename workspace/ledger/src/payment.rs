use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime};
use model::entities::{auto_transfer::TransferTrigger, transaction, transaction::TransactionKind};
use tracing::{debug, instrument};

use crate::auto_transfer::plan_transfer;
use crate::card::CardTerms;
use crate::error::{LedgerError, Result};
use crate::money::MoneyAmount;
use crate::store::{BalanceDelta, LedgerStore, LedgerUnit, NewTransaction};

/// A card payment to process.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub user_id: i32,
    pub card_id: i32,
    pub amount: MoneyAmount,
    pub currency_code: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
}

/// First instant of the month containing `now`. Computed once per payment so
/// a month rollover mid-call cannot split the usage window.
pub fn month_start(now: NaiveDateTime) -> NaiveDateTime {
    now.date()
        .with_day(1)
        .unwrap_or_else(|| now.date())
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now)
}

/// Applies the per-card-type payment policy and records the expense.
#[derive(Clone)]
pub struct PaymentProcessor {
    store: Arc<dyn LedgerStore>,
}

impl PaymentProcessor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Process one card payment.
    ///
    /// Dispatches on the card's terms, folds in an auto-transfer when a
    /// debit card needs one, and commits balance mutations plus exactly one
    /// Expense transaction as a single unit. Either everything becomes
    /// visible or nothing does.
    #[instrument(skip(self, request), fields(card_id = request.card_id, amount = %request.amount))]
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
        now: NaiveDateTime,
    ) -> Result<transaction::Model> {
        if !request.amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(request.amount.amount()));
        }

        let card = self.store.card(request.card_id, request.user_id).await?;
        if !card.is_active {
            return Err(LedgerError::CardInactive(card.id));
        }

        let amount = request.amount.amount();
        let mut unit = LedgerUnit::default();

        match CardTerms::try_from(&card)? {
            CardTerms::Credit { credit_limit, .. } => {
                let usage = self
                    .store
                    .monthly_expense(card.id, month_start(now), now)
                    .await?;
                if usage + amount > credit_limit {
                    return Err(LedgerError::CreditLimitExceeded {
                        usage,
                        amount,
                        limit: credit_limit,
                    });
                }
                // Usage is derived from transactions; the card itself holds
                // no balance to mutate.
            }
            CardTerms::Debit {
                auto_transfer_enabled,
                balance,
                ..
            } => {
                if balance < amount {
                    if auto_transfer_enabled {
                        let plan = plan_transfer(
                            self.store.as_ref(),
                            request.user_id,
                            &card,
                            request.amount,
                            &request.currency_code,
                        )
                        .await?;
                        if let Some(plan) = plan {
                            plan.fold_into(&mut unit, TransferTrigger::Payment, now);
                        }
                    } else {
                        return Err(LedgerError::InsufficientBalance { balance, amount });
                    }
                }
                unit.balance_deltas.push(BalanceDelta::card(card.id, -amount));
            }
            CardTerms::Prepaid { balance } => {
                if balance < amount {
                    return Err(LedgerError::InsufficientPrepaidBalance { balance, amount });
                }
                unit.balance_deltas.push(BalanceDelta::card(card.id, -amount));
            }
            CardTerms::Postpay { monthly_limit, .. } => {
                let usage = self
                    .store
                    .monthly_expense(card.id, month_start(now), now)
                    .await?;
                if usage + amount > monthly_limit {
                    return Err(LedgerError::MonthlyLimitExceeded {
                        usage,
                        amount,
                        limit: monthly_limit,
                    });
                }
            }
        }

        unit.transactions.push(NewTransaction {
            account_id: card.account_id,
            card_id: Some(card.id),
            category_id: request.category_id,
            kind: TransactionKind::Expense,
            amount,
            currency_code: request.currency_code,
            date: now,
            description: request.description,
        });

        let committed = self.store.commit(unit).await?;
        debug!(card_id = card.id, "payment committed");

        // The expense is the only non-transfer row in the unit.
        committed
            .transactions
            .into_iter()
            .find(|t| t.kind == TransactionKind::Expense)
            .ok_or_else(|| {
                LedgerError::Unavailable(sea_orm::DbErr::Custom(
                    "committed payment unit is missing its expense transaction".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryLedgerStore;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn money(value: i64) -> MoneyAmount {
        MoneyAmount::new(Decimal::from(value))
    }

    fn request(card_id: i32, amount: i64) -> PaymentRequest {
        PaymentRequest {
            user_id: 1,
            card_id,
            amount: money(amount),
            currency_code: "KRW".to_string(),
            description: Some("coffee".to_string()),
            category_id: None,
        }
    }

    #[test]
    fn test_month_start() {
        assert_eq!(
            month_start(now()),
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_credit_limit_exceeded() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_credit_card(1, account, Decimal::from(10_000));

        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 15_000), now())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::CreditLimitExceeded { .. }));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_credit_usage_accumulates_within_month() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_credit_card(1, account, Decimal::from(10_000));

        let processor = PaymentProcessor::new(store.clone());
        processor
            .process_payment(request(card, 6_000), now())
            .await
            .unwrap();
        processor
            .process_payment(request(card, 4_000), now())
            .await
            .unwrap();

        // Limit is now fully used; one more won falls over it.
        let err = processor
            .process_payment(request(card, 1), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::CreditLimitExceeded { .. }));

        let total: Decimal = store.transactions().iter().map(|t| t.amount).sum();
        assert_eq!(total, Decimal::from(10_000));
    }

    #[tokio::test]
    async fn test_credit_usage_resets_across_months() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_credit_card(1, account, Decimal::from(10_000));

        let processor = PaymentProcessor::new(store.clone());
        let may = chrono::NaiveDate::from_ymd_opt(2024, 5, 28)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        processor
            .process_payment(request(card, 9_000), may)
            .await
            .unwrap();

        // June window starts clean
        processor
            .process_payment(request(card, 9_000), now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_debit_auto_transfer_scenario() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let savings = store.add_account(1, "KRW", Decimal::from(100_000));
        let card = store.add_debit_card(
            1,
            checking,
            Some(savings),
            true,
            Decimal::from(10_000),
            Decimal::from(3_000),
        );

        let processor = PaymentProcessor::new(store.clone());
        let payment = processor
            .process_payment(request(card, 5_000), now())
            .await
            .unwrap();

        assert_eq!(payment.kind, TransactionKind::Expense);
        assert_eq!(payment.amount, Decimal::from(5_000));

        // transfer = 5000 - 3000 + 10000 = 12000
        assert_eq!(store.account_balance(savings), Decimal::from(88_000));
        // card: 3000 + 12000 - 5000 = 10000, back at the floor
        assert_eq!(store.card_balance(card), Decimal::from(10_000));

        let transfers = store.auto_transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, Decimal::from(12_000));
        assert_eq!(transfers[0].triggered_by, TransferTrigger::Payment);

        // One expense plus two transfer legs, all from one commit
        assert_eq!(store.transactions().len(), 3);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_debit_without_auto_transfer_fails() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_debit_card(
            1,
            checking,
            None,
            false,
            Decimal::ZERO,
            Decimal::from(3_000),
        );

        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 5_000), now())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(store.card_balance(card), Decimal::from(3_000));
    }

    #[tokio::test]
    async fn test_debit_covered_pays_directly() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let savings = store.add_account(1, "KRW", Decimal::from(100_000));
        let card = store.add_debit_card(
            1,
            checking,
            Some(savings),
            true,
            Decimal::ZERO,
            Decimal::from(50_000),
        );

        let processor = PaymentProcessor::new(store.clone());
        processor
            .process_payment(request(card, 5_000), now())
            .await
            .unwrap();

        assert_eq!(store.card_balance(card), Decimal::from(45_000));
        assert_eq!(store.account_balance(savings), Decimal::from(100_000));
        assert!(store.auto_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_prepaid_insufficient() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_prepaid_card(1, account, Decimal::from(1_000));

        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 2_000), now())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientPrepaidBalance { .. }));
        // No transaction was created
        assert!(store.transactions().is_empty());
        assert_eq!(store.card_balance(card), Decimal::from(1_000));
    }

    #[tokio::test]
    async fn test_prepaid_payment_decrements() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_prepaid_card(1, account, Decimal::from(5_000));

        let processor = PaymentProcessor::new(store.clone());
        processor
            .process_payment(request(card, 2_000), now())
            .await
            .unwrap();

        assert_eq!(store.card_balance(card), Decimal::from(3_000));
        assert_eq!(store.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_postpay_monthly_limit() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_postpay_card(1, account, Decimal::from(300_000));

        let processor = PaymentProcessor::new(store.clone());
        processor
            .process_payment(request(card, 250_000), now())
            .await
            .unwrap();

        let err = processor
            .process_payment(request(card, 60_000), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MonthlyLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_inactive_card_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_prepaid_card(1, account, Decimal::from(5_000));
        store.deactivate_card(card);

        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 100), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::CardInactive(_)));
    }

    #[tokio::test]
    async fn test_foreign_card_is_not_found() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(2, "KRW", Decimal::ZERO);
        let card = store.add_prepaid_card(2, account, Decimal::from(5_000));

        let processor = PaymentProcessor::new(store.clone());
        // user 1 cannot see user 2's card
        let err = processor
            .process_payment(request(card, 100), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let account = store.add_account(1, "KRW", Decimal::ZERO);
        let card = store.add_prepaid_card(1, account, Decimal::from(5_000));

        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 0), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount(_)));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let savings = store.add_account(1, "KRW", Decimal::from(100_000));
        let card = store.add_debit_card(
            1,
            checking,
            Some(savings),
            true,
            Decimal::from(10_000),
            Decimal::from(3_000),
        );

        store.fail_next_commit();
        let processor = PaymentProcessor::new(store.clone());
        let err = processor
            .process_payment(request(card, 5_000), now())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Unavailable(_)));
        // The planned transfer and payment are both invisible
        assert_eq!(store.account_balance(savings), Decimal::from(100_000));
        assert_eq!(store.card_balance(card), Decimal::from(3_000));
        assert!(store.transactions().is_empty());
        assert!(store.auto_transfers().is_empty());
    }
}
