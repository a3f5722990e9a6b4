use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use ledger::card::CardTerms;
use ledger::error::LedgerError;
use model::entities::card::{self, CardType};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::accounts::find_owned;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, OwnerQuery};

/// Request body for creating a card. Only the attribute subset matching
/// `card_type` may be present; anything else is rejected up front.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCardRequest {
    pub name: String,
    pub owner_id: i32,
    /// Settlement account the card draws from or deposits into
    pub account_id: i32,
    #[schema(value_type = String)]
    pub card_type: CardType,
    pub credit_limit: Option<Decimal>,
    pub billing_day: Option<i32>,
    pub payment_day: Option<i32>,
    pub linked_account_id: Option<i32>,
    pub auto_transfer_enabled: Option<bool>,
    pub min_balance: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub monthly_limit: Option<Decimal>,
    pub settlement_day: Option<i32>,
}

/// Request body for updating a card
#[derive(Debug, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateCardRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Card response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardResponse {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    pub account_id: i32,
    #[schema(value_type = String)]
    pub card_type: CardType,
    pub is_active: bool,
    pub credit_limit: Option<Decimal>,
    pub billing_day: Option<i32>,
    pub payment_day: Option<i32>,
    pub linked_account_id: Option<i32>,
    pub auto_transfer_enabled: Option<bool>,
    pub min_balance: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub monthly_limit: Option<Decimal>,
    pub settlement_day: Option<i32>,
}

impl From<card::Model> for CardResponse {
    fn from(model: card::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner_id: model.owner_id,
            account_id: model.account_id,
            card_type: model.card_type,
            is_active: model.is_active,
            credit_limit: model.credit_limit,
            billing_day: model.billing_day,
            payment_day: model.payment_day,
            linked_account_id: model.linked_account_id,
            auto_transfer_enabled: model.auto_transfer_enabled,
            min_balance: model.min_balance,
            balance: model.balance,
            monthly_limit: model.monthly_limit,
            settlement_day: model.settlement_day,
        }
    }
}

/// Create a new card
#[utoipa::path(
    post,
    path = "/api/v1/cards",
    tag = "cards",
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created successfully", body = ApiResponse<CardResponse>),
        (status = 400, description = "Attributes do not match the card type", body = ErrorResponse),
        (status = 404, description = "Settlement or linked account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_card(
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CardResponse>>), ApiError> {
    // Both referenced accounts must exist and belong to the card owner.
    find_owned(&state, request.account_id, request.owner_id).await?;
    if let Some(linked_id) = request.linked_account_id {
        find_owned(&state, linked_id, request.owner_id).await?;
    }

    let prospective = card::Model {
        id: 0,
        name: request.name.clone(),
        owner_id: request.owner_id,
        account_id: request.account_id,
        card_type: request.card_type,
        is_active: true,
        credit_limit: request.credit_limit,
        billing_day: request.billing_day,
        payment_day: request.payment_day,
        linked_account_id: request.linked_account_id,
        auto_transfer_enabled: request.auto_transfer_enabled,
        min_balance: request.min_balance,
        balance: request.balance,
        monthly_limit: request.monthly_limit,
        settlement_day: request.settlement_day,
    };

    // The engine's own terms conversion decides whether the attribute subset
    // fits the type; here a mismatch is a bad request, not a corrupt row.
    if let Err(err) = CardTerms::try_from(&prospective) {
        return Err(ApiError::bad_request(err.to_string()));
    }

    let model = card::ActiveModel {
        name: Set(prospective.name),
        owner_id: Set(prospective.owner_id),
        account_id: Set(prospective.account_id),
        card_type: Set(prospective.card_type),
        is_active: Set(true),
        credit_limit: Set(prospective.credit_limit),
        billing_day: Set(prospective.billing_day),
        payment_day: Set(prospective.payment_day),
        linked_account_id: Set(prospective.linked_account_id),
        auto_transfer_enabled: Set(prospective.auto_transfer_enabled),
        min_balance: Set(prospective.min_balance),
        balance: Set(prospective.balance),
        monthly_limit: Set(prospective.monthly_limit),
        settlement_day: Set(prospective.settlement_day),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CardResponse::from(model),
            message: "Card created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get all cards owned by a user
#[utoipa::path(
    get,
    path = "/api/v1/cards",
    tag = "cards",
    params(
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Cards retrieved successfully", body = ApiResponse<Vec<CardResponse>>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_cards(
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CardResponse>>>, ApiError> {
    let cards = card::Entity::find()
        .filter(card::Column::OwnerId.eq(query.user_id))
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: cards.into_iter().map(CardResponse::from).collect(),
        message: "Cards retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a specific card by ID
#[utoipa::path(
    get,
    path = "/api/v1/cards/{card_id}",
    tag = "cards",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Card retrieved successfully", body = ApiResponse<CardResponse>),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_card(
    Path(card_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CardResponse>>, ApiError> {
    let card = find_owned_card(&state, card_id, query.user_id).await?;

    Ok(Json(ApiResponse {
        data: CardResponse::from(card),
        message: "Card retrieved successfully".to_string(),
        success: true,
    }))
}

pub(crate) async fn find_owned_card(
    state: &AppState,
    card_id: i32,
    user_id: i32,
) -> Result<card::Model, ApiError> {
    card::Entity::find_by_id(card_id)
        .filter(card::Column::OwnerId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::Ledger(LedgerError::CardNotFound(card_id)))
}

/// Update a card's name or activation flag
#[utoipa::path(
    put,
    path = "/api/v1/cards/{card_id}",
    tag = "cards",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    request_body = UpdateCardRequest,
    responses(
        (status = 200, description = "Card updated successfully", body = ApiResponse<CardResponse>),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_card(
    Path(card_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<ApiResponse<CardResponse>>, ApiError> {
    let existing = find_owned_card(&state, card_id, query.user_id).await?;

    let mut active: card::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse {
        data: CardResponse::from(updated),
        message: "Card updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a card
#[utoipa::path(
    delete,
    path = "/api/v1/cards/{card_id}",
    tag = "cards",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Card deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_card(
    Path(card_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let existing = find_owned_card(&state, card_id, query.user_id).await?;

    card::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: format!("Card {} deleted", card_id),
        message: "Card deleted successfully".to_string(),
        success: true,
    }))
}
