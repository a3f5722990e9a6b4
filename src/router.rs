use crate::handlers::{
    accounts::{create_account, delete_account, get_account, get_accounts, update_account},
    cards::{create_card, delete_card, get_card, get_cards, update_card},
    categories::{create_category, delete_category, get_categories},
    health::health_check,
    payments::{get_card_auto_transfers, process_payment, trigger_auto_transfer},
    scheduled_transactions::{
        cancel_scheduled_transaction, create_scheduled_transaction, delete_scheduled_transaction,
        execute_scheduled_transaction, get_reminders, get_scheduled_transaction,
        get_scheduled_transactions, mark_overdue, update_scheduled_transaction,
    },
    transactions::{get_account_transactions, get_transaction, get_transactions},
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // User CRUD routes
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users", get(get_users))
        .route("/api/v1/users/:user_id", get(get_user))
        .route("/api/v1/users/:user_id", put(update_user))
        .route("/api/v1/users/:user_id", delete(delete_user))
        // Category routes
        .route("/api/v1/categories", post(create_category))
        .route("/api/v1/categories", get(get_categories))
        .route("/api/v1/categories/:category_id", delete(delete_category))
        // Account CRUD routes
        .route("/api/v1/accounts", post(create_account))
        .route("/api/v1/accounts", get(get_accounts))
        .route("/api/v1/accounts/:account_id", get(get_account))
        .route("/api/v1/accounts/:account_id", put(update_account))
        .route("/api/v1/accounts/:account_id", delete(delete_account))
        // Card CRUD routes
        .route("/api/v1/cards", post(create_card))
        .route("/api/v1/cards", get(get_cards))
        .route("/api/v1/cards/:card_id", get(get_card))
        .route("/api/v1/cards/:card_id", put(update_card))
        .route("/api/v1/cards/:card_id", delete(delete_card))
        // Payment and auto-transfer routes
        .route("/api/v1/cards/:card_id/payments", post(process_payment))
        .route(
            "/api/v1/cards/:card_id/auto-transfers",
            post(trigger_auto_transfer),
        )
        .route(
            "/api/v1/cards/:card_id/auto-transfers",
            get(get_card_auto_transfers),
        )
        // Transaction read-only routes
        .route("/api/v1/transactions", get(get_transactions))
        .route("/api/v1/transactions/:transaction_id", get(get_transaction))
        .route(
            "/api/v1/accounts/:account_id/transactions",
            get(get_account_transactions),
        )
        // Scheduled transaction lifecycle routes
        .route(
            "/api/v1/scheduled-transactions",
            post(create_scheduled_transaction),
        )
        .route(
            "/api/v1/scheduled-transactions",
            get(get_scheduled_transactions),
        )
        .route(
            "/api/v1/scheduled-transactions/mark-overdue",
            post(mark_overdue),
        )
        .route("/api/v1/scheduled-transactions/reminders", get(get_reminders))
        .route(
            "/api/v1/scheduled-transactions/:scheduled_id",
            get(get_scheduled_transaction),
        )
        .route(
            "/api/v1/scheduled-transactions/:scheduled_id",
            put(update_scheduled_transaction),
        )
        .route(
            "/api/v1/scheduled-transactions/:scheduled_id",
            delete(delete_scheduled_transaction),
        )
        .route(
            "/api/v1/scheduled-transactions/:scheduled_id/execute",
            post(execute_scheduled_transaction),
        )
        .route(
            "/api/v1/scheduled-transactions/:scheduled_id/cancel",
            post(cancel_scheduled_transaction),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
