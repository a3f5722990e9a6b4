use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::NaiveDateTime;
use model::entities::{account, transaction, transaction::TransactionKind};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::accounts::find_owned;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, OwnerQuery};

/// Transaction response model. Transactions are created only by committed
/// ledger units (payments, auto-transfer legs, scheduled executions); this
/// surface is read-only.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub account_id: i32,
    pub card_id: Option<i32>,
    pub category_id: Option<i32>,
    #[schema(value_type = String)]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency_code: String,
    pub date: NaiveDateTime,
    pub description: Option<String>,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            card_id: model.card_id,
            category_id: model.category_id,
            kind: model.kind,
            amount: model.amount,
            currency_code: model.currency_code,
            date: model.date,
            description: model.description,
        }
    }
}

/// Get all transactions across a user's accounts
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transactions(
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let account_ids: Vec<i32> = account::Entity::find()
        .filter(account::Column::OwnerId.eq(query.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();

    let transactions = transaction::Entity::find()
        .filter(transaction::Column::AccountId.is_in(account_ids))
        .order_by_desc(transaction::Column::Date)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: transactions.into_iter().map(TransactionResponse::from).collect(),
        message: "Transactions retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get transactions for a specific account
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}/transactions",
    tag = "transactions",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Account transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_account_transactions(
    Path(account_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let account = find_owned(&state, account_id, query.user_id).await?;

    let transactions = transaction::Entity::find()
        .filter(transaction::Column::AccountId.eq(account.id))
        .order_by_desc(transaction::Column::Date)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: transactions.into_iter().map(TransactionResponse::from).collect(),
        message: "Account transactions retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a specific transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transaction(
    Path(transaction_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let transaction = transaction::Entity::find_by_id(transaction_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("transaction {transaction_id}")))?;

    // Ownership runs through the account the entry posts to
    find_owned(&state, transaction.account_id, query.user_id)
        .await
        .map_err(|_| ApiError::not_found(format!("transaction {transaction_id}")))?;

    Ok(Json(ApiResponse {
        data: TransactionResponse::from(transaction),
        message: "Transaction retrieved successfully".to_string(),
        success: true,
    }))
}
