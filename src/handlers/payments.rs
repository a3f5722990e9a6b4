use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDateTime, Utc};
use ledger::money::MoneyAmount;
use ledger::payment::PaymentRequest;
use model::entities::auto_transfer::{self, AutoTransferStatus, TransferTrigger};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::cards::find_owned_card;
use crate::handlers::transactions::TransactionResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, OwnerQuery};

/// Request body for a card payment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentBody {
    pub user_id: i32,
    pub amount: Decimal,
    pub currency_code: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
}

/// Request body for an explicit auto-transfer trigger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutoTransferBody {
    pub user_id: i32,
    /// Amount the card must be able to cover after the transfer
    pub required_amount: Decimal,
    pub currency_code: String,
}

/// Auto-transfer response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutoTransferResponse {
    pub id: i32,
    pub card_id: i32,
    pub from_account_id: i32,
    pub to_account_id: i32,
    pub amount: Decimal,
    pub currency_code: String,
    #[schema(value_type = String)]
    pub status: AutoTransferStatus,
    #[schema(value_type = String)]
    pub triggered_by: TransferTrigger,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl From<auto_transfer::Model> for AutoTransferResponse {
    fn from(model: auto_transfer::Model) -> Self {
        Self {
            id: model.id,
            card_id: model.card_id,
            from_account_id: model.from_account_id,
            to_account_id: model.to_account_id,
            amount: model.amount,
            currency_code: model.currency_code,
            status: model.status,
            triggered_by: model.triggered_by,
            created_at: model.created_at,
            completed_at: model.completed_at,
        }
    }
}

/// Process a card payment
///
/// Applies the card-type policy (limit check, balance check, auto-transfer)
/// and records the expense, all as one atomic unit.
#[utoipa::path(
    post,
    path = "/api/v1/cards/{card_id}/payments",
    tag = "payments",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
    ),
    request_body = PaymentBody,
    responses(
        (status = 201, description = "Payment processed successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Card not found", body = ErrorResponse),
        (status = 409, description = "Card is inactive", body = ErrorResponse),
        (status = 422, description = "A card policy rejected the payment", body = ErrorResponse),
        (status = 503, description = "Ledger commit failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, body), fields(card_id = card_id))]
pub async fn process_payment(
    Path(card_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<PaymentBody>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    let now = Utc::now().naive_utc();
    let transaction = state
        .engine
        .payments
        .process_payment(
            PaymentRequest {
                user_id: body.user_id,
                card_id,
                amount: MoneyAmount::new(body.amount),
                currency_code: body.currency_code,
                description: body.description,
                category_id: body.category_id,
            },
            now,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TransactionResponse::from(transaction),
            message: "Payment processed successfully".to_string(),
            success: true,
        }),
    ))
}

/// Trigger an auto-transfer for a debit card
///
/// Tops the card up so it can cover `required_amount`, restoring its balance
/// floor. A card that already covers the amount yields no transfer.
#[utoipa::path(
    post,
    path = "/api/v1/cards/{card_id}/auto-transfers",
    tag = "payments",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
    ),
    request_body = AutoTransferBody,
    responses(
        (status = 201, description = "Auto-transfer executed", body = ApiResponse<Option<AutoTransferResponse>>),
        (status = 404, description = "Card not found", body = ErrorResponse),
        (status = 409, description = "Auto-transfer not enabled", body = ErrorResponse),
        (status = 422, description = "Linked account cannot cover the transfer", body = ErrorResponse)
    )
)]
#[instrument(skip(state, body), fields(card_id = card_id))]
pub async fn trigger_auto_transfer(
    Path(card_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<AutoTransferBody>,
) -> Result<(StatusCode, Json<ApiResponse<Option<AutoTransferResponse>>>), ApiError> {
    let now = Utc::now().naive_utc();
    let transfer = state
        .engine
        .auto_transfers
        .execute(
            body.user_id,
            card_id,
            MoneyAmount::new(body.required_amount),
            &body.currency_code,
            TransferTrigger::LowBalance,
            now,
        )
        .await?;

    let message = match &transfer {
        Some(_) => "Auto-transfer executed successfully".to_string(),
        None => "Card already covers the required amount".to_string(),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: transfer.map(AutoTransferResponse::from),
            message,
            success: true,
        }),
    ))
}

/// List a card's auto-transfers
#[utoipa::path(
    get,
    path = "/api/v1/cards/{card_id}/auto-transfers",
    tag = "payments",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Auto-transfers retrieved successfully", body = ApiResponse<Vec<AutoTransferResponse>>),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_card_auto_transfers(
    Path(card_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AutoTransferResponse>>>, ApiError> {
    let card = find_owned_card(&state, card_id, query.user_id).await?;

    let transfers = auto_transfer::Entity::find()
        .filter(auto_transfer::Column::CardId.eq(card.id))
        .order_by_desc(auto_transfer::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: transfers.into_iter().map(AutoTransferResponse::from).collect(),
        message: "Auto-transfers retrieved successfully".to_string(),
        success: true,
    }))
}
