use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::actor_id;
use crate::services::CreateTransactionRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct CreateTransactionBody {
    pub event_id: Uuid,
    pub ticket_category_id: Uuid,
    pub quantity: i32,
    pub voucher_code: Option<String>,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub points_requested: i64,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTransactionBody>,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let detail = state
        .transactions
        .create(
            user_id,
            CreateTransactionRequest {
                event_id: body.event_id,
                ticket_category_id: body.ticket_category_id,
                quantity: body.quantity,
                voucher_code: body.voucher_code,
                coupon_code: body.coupon_code,
                points_requested: body.points_requested,
            },
        )
        .await?;

    Ok(created(detail, "Transaction created").into_response())
}

pub async fn list_my_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let summaries = state.transactions.list_for_user(user_id).await?;

    Ok(success(summaries, "Transactions fetched").into_response())
}

pub async fn get_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let actor = actor_id(&headers)?;
    let detail = state.transactions.detail(id, actor).await?;

    Ok(success(detail, "Transaction fetched").into_response())
}

#[derive(Deserialize)]
pub struct PaymentProofBody {
    pub payment_proof: String,
}

pub async fn submit_payment_proof(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentProofBody>,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let transaction = state
        .transactions
        .submit_payment_proof(id, user_id, &body.payment_proof)
        .await?;

    Ok(success(transaction, "Payment proof submitted").into_response())
}

pub async fn confirm_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let transaction = state.transactions.confirm(id, organizer_id).await?;

    Ok(success(transaction, "Transaction confirmed").into_response())
}

#[derive(Deserialize, Default)]
pub struct RejectBody {
    pub reason: Option<String>,
}

pub async fn reject_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectBody>>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let transaction = state
        .transactions
        .reject(id, organizer_id, reason.as_deref())
        .await?;

    Ok(success(transaction, "Transaction rejected").into_response())
}

pub async fn cancel_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let transaction = state.transactions.cancel(id, user_id).await?;

    Ok(success(transaction, "Transaction cancelled").into_response())
}
