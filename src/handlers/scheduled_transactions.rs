use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use ledger::error::LedgerError;
use ledger::schedule::validate_recurrence;
use model::entities::{
    scheduled_transaction,
    scheduled_transaction::{Frequency, ScheduleStatus},
    transaction::TransactionKind,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::accounts::find_owned;
use crate::handlers::transactions::TransactionResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, OwnerQuery};

/// Request body for creating a scheduled transaction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateScheduledTransactionRequest {
    pub user_id: i32,
    pub account_id: i32,
    pub category_id: Option<i32>,
    /// Income or Expense; transfers cannot be scheduled
    #[schema(value_type = String)]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency_code: String,
    pub due_date: NaiveDate,
    #[schema(value_type = Option<String>)]
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: Option<bool>,
    pub reminder_days: Option<i32>,
    pub description: Option<String>,
}

/// Request body for updating a scheduled transaction
#[derive(Debug, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateScheduledTransactionRequest {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: Option<bool>,
    pub reminder_days: Option<i32>,
    pub description: Option<String>,
}

/// Request body for executing a scheduled transaction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExecuteBody {
    pub user_id: i32,
    /// Timestamp to realize the transaction at (defaults to now)
    pub execute_date: Option<NaiveDateTime>,
    /// Whether to spawn the next occurrence of a recurring item (default true)
    pub create_recurring: Option<bool>,
}

/// Scheduled transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledTransactionResponse {
    pub id: i32,
    pub account_id: i32,
    pub category_id: Option<i32>,
    #[schema(value_type = String)]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency_code: String,
    pub due_date: NaiveDate,
    #[schema(value_type = Option<String>)]
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub is_recurring: bool,
    #[schema(value_type = String)]
    pub status: ScheduleStatus,
    pub reminder_days: i32,
    pub completed_at: Option<NaiveDateTime>,
    pub description: Option<String>,
}

impl From<scheduled_transaction::Model> for ScheduledTransactionResponse {
    fn from(model: scheduled_transaction::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            category_id: model.category_id,
            kind: model.kind,
            amount: model.amount,
            currency_code: model.currency_code,
            due_date: model.due_date,
            frequency: model.frequency,
            end_date: model.end_date,
            is_recurring: model.is_recurring,
            status: model.status,
            reminder_days: model.reminder_days,
            completed_at: model.completed_at,
            description: model.description,
        }
    }
}

/// What an execution produced
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExecutionResponse {
    pub transaction: TransactionResponse,
    pub scheduled_transaction: ScheduledTransactionResponse,
    pub next_scheduled_transaction: Option<ScheduledTransactionResponse>,
}

/// Result of an overdue marking pass
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkOverdueResponse {
    /// How many items were flipped to Overdue
    pub marked: u64,
}

/// Query parameters for listing scheduled transactions
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduledListQuery {
    pub user_id: i32,
    /// Optional status filter (Pending, Completed, Overdue, Cancelled)
    #[schema(value_type = Option<String>)]
    pub status: Option<ScheduleStatus>,
}

/// Create a new scheduled transaction
#[utoipa::path(
    post,
    path = "/api/v1/scheduled-transactions",
    tag = "scheduled-transactions",
    request_body = CreateScheduledTransactionRequest,
    responses(
        (status = 201, description = "Scheduled transaction created", body = ApiResponse<ScheduledTransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Recurring item without frequency", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_scheduled_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduledTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ScheduledTransactionResponse>>), ApiError> {
    if request.kind == TransactionKind::Transfer {
        return Err(ApiError::bad_request(
            "scheduled transactions must be Income or Expense",
        ));
    }
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::bad_request("amount must be positive"));
    }
    let is_recurring = request.is_recurring.unwrap_or(false);
    validate_recurrence(is_recurring, request.frequency).map_err(ApiError::Ledger)?;

    let account = find_owned(&state, request.account_id, request.user_id).await?;

    let model = scheduled_transaction::ActiveModel {
        account_id: Set(account.id),
        category_id: Set(request.category_id),
        kind: Set(request.kind),
        amount: Set(request.amount),
        currency_code: Set(request.currency_code),
        due_date: Set(request.due_date),
        frequency: Set(request.frequency),
        end_date: Set(request.end_date),
        is_recurring: Set(is_recurring),
        status: Set(ScheduleStatus::Pending),
        reminder_days: Set(request.reminder_days.unwrap_or(0)),
        completed_at: Set(None),
        description: Set(request.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ScheduledTransactionResponse::from(model),
            message: "Scheduled transaction created successfully".to_string(),
            success: true,
        }),
    ))
}

/// List a user's scheduled transactions
///
/// Runs the overdue pass first, so derived Overdue status is current at
/// read time.
#[utoipa::path(
    get,
    path = "/api/v1/scheduled-transactions",
    tag = "scheduled-transactions",
    params(
        ("user_id" = i32, Query, description = "Owning user ID"),
        ("status" = Option<String>, Query, description = "Optional status filter"),
    ),
    responses(
        (status = 200, description = "Scheduled transactions retrieved", body = ApiResponse<Vec<ScheduledTransactionResponse>>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_scheduled_transactions(
    Query(query): Query<ScheduledListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ScheduledTransactionResponse>>>, ApiError> {
    let today = Utc::now().date_naive();
    state.engine.schedules.mark_overdue(today).await?;

    let account_ids: Vec<i32> = model::entities::account::Entity::find()
        .filter(model::entities::account::Column::OwnerId.eq(query.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();

    let mut find = scheduled_transaction::Entity::find()
        .filter(scheduled_transaction::Column::AccountId.is_in(account_ids));
    if let Some(status) = query.status {
        find = find.filter(scheduled_transaction::Column::Status.eq(status));
    }
    let items = find
        .order_by_asc(scheduled_transaction::Column::DueDate)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: items
            .into_iter()
            .map(ScheduledTransactionResponse::from)
            .collect(),
        message: "Scheduled transactions retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a specific scheduled transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/scheduled-transactions/{scheduled_id}",
    tag = "scheduled-transactions",
    params(
        ("scheduled_id" = i32, Path, description = "Scheduled transaction ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Scheduled transaction retrieved", body = ApiResponse<ScheduledTransactionResponse>),
        (status = 404, description = "Scheduled transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_scheduled_transaction(
    Path(scheduled_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ScheduledTransactionResponse>>, ApiError> {
    let item = find_owned_scheduled(&state, scheduled_id, query.user_id).await?;

    Ok(Json(ApiResponse {
        data: ScheduledTransactionResponse::from(item),
        message: "Scheduled transaction retrieved successfully".to_string(),
        success: true,
    }))
}

async fn find_owned_scheduled(
    state: &AppState,
    scheduled_id: i32,
    user_id: i32,
) -> Result<scheduled_transaction::Model, ApiError> {
    let item = scheduled_transaction::Entity::find_by_id(scheduled_id)
        .one(&state.db)
        .await?
        .ok_or(LedgerError::ScheduledTransactionNotFound(scheduled_id))?;

    find_owned(state, item.account_id, user_id)
        .await
        .map_err(|_| ApiError::Ledger(LedgerError::ScheduledTransactionNotFound(scheduled_id)))?;

    Ok(item)
}

/// Update a scheduled transaction
///
/// Only Pending and Overdue items can change; Completed and Cancelled are
/// terminal.
#[utoipa::path(
    put,
    path = "/api/v1/scheduled-transactions/{scheduled_id}",
    tag = "scheduled-transactions",
    params(
        ("scheduled_id" = i32, Path, description = "Scheduled transaction ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    request_body = UpdateScheduledTransactionRequest,
    responses(
        (status = 200, description = "Scheduled transaction updated", body = ApiResponse<ScheduledTransactionResponse>),
        (status = 404, description = "Scheduled transaction not found", body = ErrorResponse),
        (status = 409, description = "Item is in a terminal state", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_scheduled_transaction(
    Path(scheduled_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
    Json(request): Json<UpdateScheduledTransactionRequest>,
) -> Result<Json<ApiResponse<ScheduledTransactionResponse>>, ApiError> {
    let existing = find_owned_scheduled(&state, scheduled_id, query.user_id).await?;

    match existing.status {
        ScheduleStatus::Completed => {
            return Err(LedgerError::AlreadyExecuted(scheduled_id).into())
        }
        ScheduleStatus::Cancelled => {
            return Err(LedgerError::ScheduledTransactionCancelled(scheduled_id).into())
        }
        ScheduleStatus::Pending | ScheduleStatus::Overdue => {}
    }

    let is_recurring = request.is_recurring.unwrap_or(existing.is_recurring);
    let frequency = request.frequency.or(existing.frequency);
    validate_recurrence(is_recurring, frequency).map_err(ApiError::Ledger)?;

    let mut active: scheduled_transaction::ActiveModel = existing.into();
    if let Some(amount) = request.amount {
        if amount <= Decimal::ZERO {
            return Err(ApiError::bad_request("amount must be positive"));
        }
        active.amount = Set(amount);
    }
    if let Some(due_date) = request.due_date {
        active.due_date = Set(due_date);
        // A pushed-out item is no longer overdue; the next pass re-derives it.
        active.status = Set(ScheduleStatus::Pending);
    }
    if request.frequency.is_some() {
        active.frequency = Set(request.frequency);
    }
    if request.end_date.is_some() {
        active.end_date = Set(request.end_date);
    }
    if let Some(recurring) = request.is_recurring {
        active.is_recurring = Set(recurring);
    }
    if let Some(reminder_days) = request.reminder_days {
        active.reminder_days = Set(reminder_days);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse {
        data: ScheduledTransactionResponse::from(updated),
        message: "Scheduled transaction updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a scheduled transaction
#[utoipa::path(
    delete,
    path = "/api/v1/scheduled-transactions/{scheduled_id}",
    tag = "scheduled-transactions",
    params(
        ("scheduled_id" = i32, Path, description = "Scheduled transaction ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Scheduled transaction deleted", body = ApiResponse<String>),
        (status = 404, description = "Scheduled transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_scheduled_transaction(
    Path(scheduled_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let existing = find_owned_scheduled(&state, scheduled_id, query.user_id).await?;

    scheduled_transaction::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(Json(ApiResponse {
        data: format!("Scheduled transaction {} deleted", scheduled_id),
        message: "Scheduled transaction deleted successfully".to_string(),
        success: true,
    }))
}

/// Execute a scheduled transaction
///
/// Realizes the item as a ledger transaction, applies the balance delta,
/// marks it Completed, and spawns the next occurrence of a recurring item,
/// all in one atomic unit.
#[utoipa::path(
    post,
    path = "/api/v1/scheduled-transactions/{scheduled_id}/execute",
    tag = "scheduled-transactions",
    params(
        ("scheduled_id" = i32, Path, description = "Scheduled transaction ID"),
    ),
    request_body = ExecuteBody,
    responses(
        (status = 201, description = "Scheduled transaction executed", body = ApiResponse<ExecutionResponse>),
        (status = 404, description = "Scheduled transaction not found", body = ErrorResponse),
        (status = 409, description = "Already executed or cancelled", body = ErrorResponse),
        (status = 503, description = "Ledger commit failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, body), fields(scheduled_id = scheduled_id))]
pub async fn execute_scheduled_transaction(
    Path(scheduled_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<ExecuteBody>,
) -> Result<(StatusCode, Json<ApiResponse<ExecutionResponse>>), ApiError> {
    let now = Utc::now().naive_utc();
    let outcome = state
        .engine
        .schedules
        .execute(
            body.user_id,
            scheduled_id,
            body.execute_date,
            body.create_recurring.unwrap_or(true),
            now,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ExecutionResponse {
                transaction: TransactionResponse::from(outcome.transaction),
                scheduled_transaction: ScheduledTransactionResponse::from(outcome.completed),
                next_scheduled_transaction: outcome
                    .next
                    .map(ScheduledTransactionResponse::from),
            },
            message: "Scheduled transaction executed successfully".to_string(),
            success: true,
        }),
    ))
}

/// Cancel a scheduled transaction
#[utoipa::path(
    post,
    path = "/api/v1/scheduled-transactions/{scheduled_id}/cancel",
    tag = "scheduled-transactions",
    params(
        ("scheduled_id" = i32, Path, description = "Scheduled transaction ID"),
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Scheduled transaction cancelled", body = ApiResponse<ScheduledTransactionResponse>),
        (status = 404, description = "Scheduled transaction not found", body = ErrorResponse),
        (status = 409, description = "Already executed or cancelled", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn cancel_scheduled_transaction(
    Path(scheduled_id): Path<i32>,
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ScheduledTransactionResponse>>, ApiError> {
    let cancelled = state
        .engine
        .schedules
        .cancel(query.user_id, scheduled_id)
        .await?;

    Ok(Json(ApiResponse {
        data: ScheduledTransactionResponse::from(cancelled),
        message: "Scheduled transaction cancelled successfully".to_string(),
        success: true,
    }))
}

/// Flag overdue scheduled transactions
///
/// Scheduler tick endpoint; idempotent and safe to call at any frequency.
#[utoipa::path(
    post,
    path = "/api/v1/scheduled-transactions/mark-overdue",
    tag = "scheduled-transactions",
    responses(
        (status = 200, description = "Overdue pass completed", body = ApiResponse<MarkOverdueResponse>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn mark_overdue(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MarkOverdueResponse>>, ApiError> {
    let today = Utc::now().date_naive();
    let marked = state.engine.schedules.mark_overdue(today).await?;

    Ok(Json(ApiResponse {
        data: MarkOverdueResponse { marked },
        message: "Overdue pass completed".to_string(),
        success: true,
    }))
}

/// List upcoming reminders
///
/// Pending items due within their own reminder window. Read-only; reminder
/// delivery happens outside this service.
#[utoipa::path(
    get,
    path = "/api/v1/scheduled-transactions/reminders",
    tag = "scheduled-transactions",
    params(
        ("user_id" = i32, Query, description = "Owning user ID"),
    ),
    responses(
        (status = 200, description = "Reminders retrieved", body = ApiResponse<Vec<ScheduledTransactionResponse>>),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_reminders(
    Query(query): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ScheduledTransactionResponse>>>, ApiError> {
    let today = Utc::now().date_naive();
    let due = state.engine.schedules.upcoming_reminders(today).await?;

    // The engine projection spans all users; scope it to the caller here.
    let account_ids: Vec<i32> = model::entities::account::Entity::find()
        .filter(model::entities::account::Column::OwnerId.eq(query.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();

    let reminders: Vec<ScheduledTransactionResponse> = due
        .into_iter()
        .filter(|s| account_ids.contains(&s.account_id))
        .map(ScheduledTransactionResponse::from)
        .collect();

    Ok(Json(ApiResponse {
        data: reminders,
        message: "Reminders retrieved successfully".to_string(),
        success: true,
    }))
}
