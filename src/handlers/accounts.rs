use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use model::entities::account;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, OwnerQuery};

/// Request body for creating a new account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub name: String,
    pub description: Option<String>,
    /// ISO 4217 currency code; immutable once the account exists
    pub currency_code: String,
    pub owner_id: i32,
    /// Opening balance (defaults to zero)
    pub initial_balance: Option<Decimal>,
}

/// Request body for updating an account. The currency is intentionally not
/// updatable.
#[derive(Debug, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Account response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub currency_code: String,
    pub owner_id: i32,
    pub balance: Decimal,
}

impl From<account::Model> for AccountResponse {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            currency_code: model.currency_code,
            owner_id: model.owner_id,
            balance: model.balance,
        }
    }
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    if request.currency_code.len() != 3 {
        return Err(ApiError::bad_request(
            "currency_code must be a 3-letter ISO 4217 code",
        ));
    }

    let model = account::ActiveModel {
        name: Set(request.name),
        description: Set(request.description),
        currency_code: Set(request.currency_code.to_uppercase()),
        owner_id: Set(request.owner_id),
        balance: Set(request.initial_balance.unwrap_or(Decimal::ZERO)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: AccountResponse::from(model),
            message: "Account created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get all accounts owned by a user
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "accounts",
    params(
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = ApiResponse<Vec<AccountResponse>>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_accounts(
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, ApiError> {
    let accounts = account::Entity::find()
        .filter(account::Column::OwnerId.eq(query.user_id))
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: accounts.into_iter().map(AccountResponse::from).collect(),
        message: "Accounts retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a specific account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Account retrieved successfully", body = ApiResponse<AccountResponse>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_account(
    Path(account_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = find_owned(&state, account_id, query.user_id).await?;

    Ok(Json(ApiResponse {
        data: AccountResponse::from(account),
        message: "Account retrieved successfully".to_string(),
        success: true,
    }))
}

pub(crate) async fn find_owned(
    state: &AppState,
    account_id: i32,
    user_id: i32,
) -> Result<account::Model, ApiError> {
    account::Entity::find_by_id(account_id)
        .filter(account::Column::OwnerId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("account {account_id}")))
}

/// Update an account
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated successfully", body = ApiResponse<AccountResponse>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_account(
    Path(account_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let existing = find_owned(&state, account_id, query.user_id).await?;

    let mut active: account::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse {
        data: AccountResponse::from(updated),
        message: "Account updated successfully".to_string(),
        success: true,
    }))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Account deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_account(
    Path(account_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let existing = find_owned(&state, account_id, query.user_id).await?;

    account::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: format!("Account {} deleted", account_id),
        message: "Account deleted successfully".to_string(),
        success: true,
    }))
}
