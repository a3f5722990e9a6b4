use model::entities::card::{self, CardType};
use rust_decimal::Decimal;

use crate::error::LedgerError;

/// The type-specific attributes of a card, as a tagged union.
///
/// The card row stores these as nullable columns; converting to `CardTerms`
/// up front means policy code matches on a variant instead of re-checking
/// which columns happen to be set. Conversion rejects rows that carry
/// attributes outside their type, which keeps the per-type invariant
/// observable at a single choke point.
#[derive(Debug, Clone, PartialEq)]
pub enum CardTerms {
    Credit {
        credit_limit: Decimal,
        billing_day: Option<i32>,
        payment_day: Option<i32>,
    },
    Debit {
        linked_account_id: Option<i32>,
        auto_transfer_enabled: bool,
        min_balance: Decimal,
        balance: Decimal,
    },
    Prepaid {
        balance: Decimal,
    },
    Postpay {
        monthly_limit: Decimal,
        settlement_day: Option<i32>,
    },
}

impl CardTerms {
    fn malformed(card: &card::Model, reason: &str) -> LedgerError {
        LedgerError::MalformedCard {
            card_id: card.id,
            reason: reason.to_string(),
        }
    }
}

impl TryFrom<&card::Model> for CardTerms {
    type Error = LedgerError;

    fn try_from(card: &card::Model) -> Result<Self, Self::Error> {
        match card.card_type {
            CardType::Credit => {
                if card.balance.is_some() || card.monthly_limit.is_some() {
                    return Err(Self::malformed(card, "credit card carries balance fields"));
                }
                let credit_limit = card
                    .credit_limit
                    .ok_or_else(|| Self::malformed(card, "credit card without credit_limit"))?;
                Ok(CardTerms::Credit {
                    credit_limit,
                    billing_day: card.billing_day,
                    payment_day: card.payment_day,
                })
            }
            CardType::Debit => {
                if card.credit_limit.is_some() || card.monthly_limit.is_some() {
                    return Err(Self::malformed(card, "debit card carries limit fields"));
                }
                let balance = card
                    .balance
                    .ok_or_else(|| Self::malformed(card, "debit card without balance"))?;
                Ok(CardTerms::Debit {
                    linked_account_id: card.linked_account_id,
                    auto_transfer_enabled: card.auto_transfer_enabled.unwrap_or(false),
                    min_balance: card.min_balance.unwrap_or(Decimal::ZERO),
                    balance,
                })
            }
            CardType::Prepaid => {
                if card.credit_limit.is_some()
                    || card.monthly_limit.is_some()
                    || card.linked_account_id.is_some()
                {
                    return Err(Self::malformed(card, "prepaid card carries foreign fields"));
                }
                let balance = card
                    .balance
                    .ok_or_else(|| Self::malformed(card, "prepaid card without balance"))?;
                Ok(CardTerms::Prepaid { balance })
            }
            CardType::Postpay => {
                if card.credit_limit.is_some() || card.balance.is_some() {
                    return Err(Self::malformed(card, "postpay card carries foreign fields"));
                }
                let monthly_limit = card
                    .monthly_limit
                    .ok_or_else(|| Self::malformed(card, "postpay card without monthly_limit"))?;
                Ok(CardTerms::Postpay {
                    monthly_limit,
                    settlement_day: card.settlement_day,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_card(card_type: CardType) -> card::Model {
        card::Model {
            id: 1,
            name: "test".to_string(),
            owner_id: 1,
            account_id: 1,
            card_type,
            is_active: true,
            credit_limit: None,
            billing_day: None,
            payment_day: None,
            linked_account_id: None,
            auto_transfer_enabled: None,
            min_balance: None,
            balance: None,
            monthly_limit: None,
            settlement_day: None,
        }
    }

    #[test]
    fn test_credit_terms() {
        let mut card = base_card(CardType::Credit);
        card.credit_limit = Some(Decimal::from(10_000));
        card.billing_day = Some(25);

        let terms = CardTerms::try_from(&card).unwrap();
        assert_eq!(
            terms,
            CardTerms::Credit {
                credit_limit: Decimal::from(10_000),
                billing_day: Some(25),
                payment_day: None,
            }
        );
    }

    #[test]
    fn test_credit_without_limit_is_malformed() {
        let card = base_card(CardType::Credit);
        let err = CardTerms::try_from(&card).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedCard { card_id: 1, .. }));
    }

    #[test]
    fn test_debit_defaults() {
        let mut card = base_card(CardType::Debit);
        card.balance = Some(Decimal::from(500));

        // auto_transfer_enabled and min_balance default rather than error
        let terms = CardTerms::try_from(&card).unwrap();
        assert_eq!(
            terms,
            CardTerms::Debit {
                linked_account_id: None,
                auto_transfer_enabled: false,
                min_balance: Decimal::ZERO,
                balance: Decimal::from(500),
            }
        );
    }

    #[test]
    fn test_foreign_attribute_rejected() {
        let mut card = base_card(CardType::Prepaid);
        card.balance = Some(Decimal::from(100));
        card.credit_limit = Some(Decimal::from(10_000));

        let err = CardTerms::try_from(&card).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedCard { .. }));
    }

    #[test]
    fn test_postpay_terms() {
        let mut card = base_card(CardType::Postpay);
        card.monthly_limit = Some(Decimal::from(300_000));
        card.settlement_day = Some(15);

        let terms = CardTerms::try_from(&card).unwrap();
        assert_eq!(
            terms,
            CardTerms::Postpay {
                monthly_limit: Decimal::from(300_000),
                settlement_day: Some(15),
            }
        );
    }
}
