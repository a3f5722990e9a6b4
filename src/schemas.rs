use ledger::LedgerEngine;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection, for plain reads the engine does not mediate
    pub db: DatabaseConnection,
    /// The ledger consistency engine; every mutation goes through it
    pub engine: LedgerEngine,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Stable machine-checkable error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Query carrying the acting user. Session resolution lives outside this
/// service; callers pass the resolved id explicitly.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OwnerQuery {
    pub user_id: i32,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::delete_category,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::get_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::update_account,
        crate::handlers::accounts::delete_account,
        crate::handlers::cards::create_card,
        crate::handlers::cards::get_cards,
        crate::handlers::cards::get_card,
        crate::handlers::cards::update_card,
        crate::handlers::cards::delete_card,
        crate::handlers::payments::process_payment,
        crate::handlers::payments::trigger_auto_transfer,
        crate::handlers::payments::get_card_auto_transfers,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::get_account_transactions,
        crate::handlers::scheduled_transactions::create_scheduled_transaction,
        crate::handlers::scheduled_transactions::get_scheduled_transactions,
        crate::handlers::scheduled_transactions::get_scheduled_transaction,
        crate::handlers::scheduled_transactions::update_scheduled_transaction,
        crate::handlers::scheduled_transactions::delete_scheduled_transaction,
        crate::handlers::scheduled_transactions::execute_scheduled_transaction,
        crate::handlers::scheduled_transactions::cancel_scheduled_transaction,
        crate::handlers::scheduled_transactions::mark_overdue,
        crate::handlers::scheduled_transactions::get_reminders,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::accounts::CreateAccountRequest,
            crate::handlers::accounts::UpdateAccountRequest,
            crate::handlers::accounts::AccountResponse,
            crate::handlers::cards::CreateCardRequest,
            crate::handlers::cards::UpdateCardRequest,
            crate::handlers::cards::CardResponse,
            crate::handlers::payments::PaymentBody,
            crate::handlers::payments::AutoTransferBody,
            crate::handlers::payments::AutoTransferResponse,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::scheduled_transactions::CreateScheduledTransactionRequest,
            crate::handlers::scheduled_transactions::UpdateScheduledTransactionRequest,
            crate::handlers::scheduled_transactions::ScheduledTransactionResponse,
            crate::handlers::scheduled_transactions::ExecuteBody,
            crate::handlers::scheduled_transactions::ExecutionResponse,
            crate::handlers::scheduled_transactions::MarkOverdueResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User management"),
        (name = "categories", description = "Category management"),
        (name = "accounts", description = "Account management"),
        (name = "cards", description = "Card management"),
        (name = "payments", description = "Card payments and auto-transfers"),
        (name = "transactions", description = "Realized ledger transactions"),
        (name = "scheduled-transactions", description = "Scheduled transaction lifecycle"),
    ),
    info(
        title = "Cardledger API",
        description = "Card-centric household ledger with payment policies, auto-transfers, and scheduled transactions",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
