use std::sync::Arc;

use chrono::NaiveDateTime;
use model::entities::{auto_transfer, auto_transfer::TransferTrigger, card, transaction::TransactionKind};
use tracing::{debug, instrument};

use crate::card::CardTerms;
use crate::error::{LedgerError, Result};
use crate::money::MoneyAmount;
use crate::store::{BalanceDelta, LedgerStore, LedgerUnit, NewAutoTransfer, NewTransaction};

/// A computed auto-transfer, not yet committed.
///
/// The payment processor folds a plan into its own unit so the transfer and
/// the payment that needed it land in one atomic commit; the standalone
/// engine commits a unit holding nothing else.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub card_id: i32,
    pub from_account_id: i32,
    pub to_account_id: i32,
    pub amount: MoneyAmount,
    pub currency_code: String,
}

impl TransferPlan {
    /// Append the transfer's mutations to a unit: debit the linked account,
    /// credit the settlement account, raise the card balance, record the
    /// audit row and both transfer legs.
    pub fn fold_into(&self, unit: &mut LedgerUnit, trigger: TransferTrigger, now: NaiveDateTime) {
        let amount = self.amount.amount();

        unit.balance_deltas
            .push(BalanceDelta::account(self.from_account_id, -amount));
        unit.balance_deltas
            .push(BalanceDelta::account(self.to_account_id, amount));
        unit.balance_deltas.push(BalanceDelta::card(self.card_id, amount));

        unit.transactions.push(NewTransaction {
            account_id: self.from_account_id,
            card_id: Some(self.card_id),
            category_id: None,
            kind: TransactionKind::Transfer,
            amount,
            currency_code: self.currency_code.clone(),
            date: now,
            description: Some("Auto-transfer to card settlement account".to_string()),
        });
        unit.transactions.push(NewTransaction {
            account_id: self.to_account_id,
            card_id: Some(self.card_id),
            category_id: None,
            kind: TransactionKind::Transfer,
            amount,
            currency_code: self.currency_code.clone(),
            date: now,
            description: Some("Auto-transfer from linked account".to_string()),
        });

        unit.auto_transfer = Some(NewAutoTransfer {
            card_id: self.card_id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount,
            currency_code: self.currency_code.clone(),
            triggered_by: trigger,
            created_at: now,
        });
    }
}

/// Compute the transfer a debit card needs to cover `required` while ending
/// at or above its balance floor.
///
/// Returns `Ok(None)` when the card already covers the requirement; that is
/// a no-op, not a failure. The linked account is loaded through the store so
/// a cross-user link dies here.
pub(crate) async fn plan_transfer(
    store: &dyn LedgerStore,
    user_id: i32,
    card: &card::Model,
    required: MoneyAmount,
    currency_code: &str,
) -> Result<Option<TransferPlan>> {
    let terms = CardTerms::try_from(card)?;
    let CardTerms::Debit {
        linked_account_id,
        auto_transfer_enabled,
        min_balance,
        balance,
    } = terms
    else {
        return Err(LedgerError::AutoTransferNotEnabled(card.id));
    };

    if !auto_transfer_enabled {
        return Err(LedgerError::AutoTransferNotEnabled(card.id));
    }
    let Some(linked_account_id) = linked_account_id else {
        return Err(LedgerError::AutoTransferNotEnabled(card.id));
    };

    // transfer = required - balance + min_balance, so the card ends at the
    // floor after paying `required`.
    let transfer = required.amount() - balance + min_balance;
    if transfer <= rust_decimal::Decimal::ZERO {
        return Ok(None);
    }

    let linked = store.account(linked_account_id, user_id).await?;
    if linked.balance < transfer {
        return Err(LedgerError::InsufficientLinkedBalance {
            account_id: linked.id,
            available: linked.balance,
            required: transfer,
        });
    }

    debug!(
        card_id = card.id,
        from = linked.id,
        amount = %transfer,
        "planned auto-transfer"
    );

    Ok(Some(TransferPlan {
        card_id: card.id,
        from_account_id: linked.id,
        to_account_id: card.account_id,
        amount: MoneyAmount::new(transfer),
        currency_code: currency_code.to_string(),
    }))
}

/// Executes standalone auto-transfers for debit cards.
#[derive(Clone)]
pub struct AutoTransferEngine {
    store: Arc<dyn LedgerStore>,
}

impl AutoTransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Top a debit card up so it can cover `required`.
    ///
    /// `Ok(None)` means no transfer was needed. On success the transfer, its
    /// audit row, and both ledger legs were committed as one unit.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        user_id: i32,
        card_id: i32,
        required: MoneyAmount,
        currency_code: &str,
        trigger: TransferTrigger,
        now: NaiveDateTime,
    ) -> Result<Option<auto_transfer::Model>> {
        let card = self.store.card(card_id, user_id).await?;

        let Some(plan) = plan_transfer(self.store.as_ref(), user_id, &card, required, currency_code)
            .await?
        else {
            return Ok(None);
        };

        let mut unit = LedgerUnit::default();
        plan.fold_into(&mut unit, trigger, now);

        let committed = self.store.commit(unit).await?;
        Ok(committed.auto_transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryLedgerStore;
    use model::entities::auto_transfer::AutoTransferStatus;
    use model::entities::transaction::TransactionKind;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn money(value: i64) -> MoneyAmount {
        MoneyAmount::new(Decimal::from(value))
    }

    #[tokio::test]
    async fn test_transfer_restores_floor() {
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

        let engine = AutoTransferEngine::new(store.clone());
        let transfer = engine
            .execute(1, card, money(5_000), "KRW", TransferTrigger::LowBalance, now())
            .await
            .unwrap()
            .expect("transfer expected");

        // 5000 - 3000 + 10000 = 12000
        assert_eq!(transfer.amount, Decimal::from(12_000));
        assert_eq!(transfer.status, AutoTransferStatus::Completed);
        assert_eq!(transfer.completed_at, Some(now()));

        assert_eq!(store.account_balance(savings), Decimal::from(88_000));
        assert_eq!(store.account_balance(checking), Decimal::from(12_000));
        assert_eq!(store.card_balance(card), Decimal::from(15_000));

        // Both audit legs recorded
        let legs: Vec<_> = store
            .transactions()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::Transfer)
            .collect();
        assert_eq!(legs.len(), 2);
        assert!(legs.iter().any(|t| t.account_id == savings));
        assert!(legs.iter().any(|t| t.account_id == checking));
    }

    #[tokio::test]
    async fn test_no_transfer_when_covered() {
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

        let engine = AutoTransferEngine::new(store.clone());
        let transfer = engine
            .execute(1, card, money(5_000), "KRW", TransferTrigger::LowBalance, now())
            .await
            .unwrap();

        assert!(transfer.is_none());
        assert_eq!(store.account_balance(savings), Decimal::from(100_000));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_linked_account_exhausted() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let savings = store.add_account(1, "KRW", Decimal::from(1_000));
        let card = store.add_debit_card(
            1,
            checking,
            Some(savings),
            true,
            Decimal::ZERO,
            Decimal::ZERO,
        );

        let engine = AutoTransferEngine::new(store.clone());
        let err = engine
            .execute(1, card, money(5_000), "KRW", TransferTrigger::LowBalance, now())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientLinkedBalance { .. }));
        // Nothing moved
        assert_eq!(store.account_balance(savings), Decimal::from(1_000));
        assert!(store.auto_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_or_unlinked_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let checking = store.add_account(1, "KRW", Decimal::ZERO);
        let savings = store.add_account(1, "KRW", Decimal::from(100_000));

        let disabled = store.add_debit_card(
            1,
            checking,
            Some(savings),
            false,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        let unlinked =
            store.add_debit_card(1, checking, None, true, Decimal::ZERO, Decimal::ZERO);

        let engine = AutoTransferEngine::new(store.clone());
        for card in [disabled, unlinked] {
            let err = engine
                .execute(1, card, money(5_000), "KRW", TransferTrigger::LowBalance, now())
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::AutoTransferNotEnabled(_)));
        }
    }

    #[tokio::test]
    async fn test_card_not_found() {
        let store = Arc::new(MemoryLedgerStore::new());
        let engine = AutoTransferEngine::new(store);

        let err = engine
            .execute(1, 42, money(5_000), "KRW", TransferTrigger::LowBalance, now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::CardNotFound(42)));
    }
}
