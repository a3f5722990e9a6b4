use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`], used by the API layer to pick
/// a response status and by callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The entity is absent or not owned by the caller.
    NotFound,
    /// A card policy rejected the operation. Expected, user-facing.
    PolicyViolation,
    /// The operation is not valid for the entity's current state.
    InvalidState,
    /// The underlying atomic commit failed or timed out. Never retried here;
    /// retrying an ambiguous commit risks double-charging.
    Unavailable,
}

/// Error types for the ledger engine.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("card {0} not found")]
    CardNotFound(i32),

    #[error("account {0} not found")]
    AccountNotFound(i32),

    #[error("scheduled transaction {0} not found")]
    ScheduledTransactionNotFound(i32),

    #[error("card {0} is inactive")]
    CardInactive(i32),

    #[error("credit limit exceeded: monthly usage {usage} plus {amount} is over limit {limit}")]
    CreditLimitExceeded {
        usage: Decimal,
        amount: Decimal,
        limit: Decimal,
    },

    #[error("monthly limit exceeded: monthly usage {usage} plus {amount} is over limit {limit}")]
    MonthlyLimitExceeded {
        usage: Decimal,
        amount: Decimal,
        limit: Decimal,
    },

    #[error("insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance { balance: Decimal, amount: Decimal },

    #[error("insufficient prepaid balance: have {balance}, need {amount}")]
    InsufficientPrepaidBalance { balance: Decimal, amount: Decimal },

    #[error("linked account {account_id} has {available}, cannot cover transfer of {required}")]
    InsufficientLinkedBalance {
        account_id: i32,
        available: Decimal,
        required: Decimal,
    },

    #[error("auto-transfer is not enabled for card {0}")]
    AutoTransferNotEnabled(i32),

    #[error("scheduled transaction {0} was already executed")]
    AlreadyExecuted(i32),

    #[error("scheduled transaction {0} is cancelled")]
    ScheduledTransactionCancelled(i32),

    #[error("a recurring scheduled transaction requires a frequency")]
    RecurringRequiresFrequency,

    #[error("payment amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("card {card_id} has attributes that do not match its type: {reason}")]
    MalformedCard { card_id: i32, reason: String },

    #[error("ledger unavailable: {0}")]
    Unavailable(#[from] sea_orm::DbErr),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CardNotFound(_)
            | Self::AccountNotFound(_)
            | Self::ScheduledTransactionNotFound(_) => ErrorKind::NotFound,
            Self::CreditLimitExceeded { .. }
            | Self::MonthlyLimitExceeded { .. }
            | Self::InsufficientBalance { .. }
            | Self::InsufficientPrepaidBalance { .. }
            | Self::InsufficientLinkedBalance { .. } => ErrorKind::PolicyViolation,
            Self::CardInactive(_)
            | Self::AutoTransferNotEnabled(_)
            | Self::AlreadyExecuted(_)
            | Self::ScheduledTransactionCancelled(_)
            | Self::RecurringRequiresFrequency
            | Self::NonPositiveAmount(_)
            | Self::MalformedCard { .. } => ErrorKind::InvalidState,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Stable machine-checkable code carried in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ScheduledTransactionNotFound(_) => "SCHEDULED_TRANSACTION_NOT_FOUND",
            Self::CardInactive(_) => "CARD_INACTIVE",
            Self::CreditLimitExceeded { .. } => "CREDIT_LIMIT_EXCEEDED",
            Self::MonthlyLimitExceeded { .. } => "MONTHLY_LIMIT_EXCEEDED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InsufficientPrepaidBalance { .. } => "INSUFFICIENT_PREPAID_BALANCE",
            Self::InsufficientLinkedBalance { .. } => "INSUFFICIENT_LINKED_BALANCE",
            Self::AutoTransferNotEnabled(_) => "AUTO_TRANSFER_NOT_ENABLED",
            Self::AlreadyExecuted(_) => "ALREADY_EXECUTED",
            Self::ScheduledTransactionCancelled(_) => "SCHEDULED_TRANSACTION_CANCELLED",
            Self::RecurringRequiresFrequency => "RECURRING_REQUIRES_FREQUENCY",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::MalformedCard { .. } => "MALFORMED_CARD",
            Self::Unavailable(_) => "LEDGER_UNAVAILABLE",
        }
    }
}

/// Type alias for Result with LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;
