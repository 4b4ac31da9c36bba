use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::actor_id;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct AwardPointsBody {
    pub user_id: Uuid,
    pub amount: i64,
    pub expires_in_days: Option<i64>,
    pub description: Option<String>,
}

/// Platform-side grant; the target user comes from the body, not the
/// actor header.
pub async fn award_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AwardPointsBody>,
) -> Result<Response, AppError> {
    actor_id(&headers)?;
    let description = body.description.as_deref().unwrap_or("Points awarded");
    let entry = state
        .points
        .award(body.user_id, body.amount, body.expires_in_days, description)
        .await?;

    Ok(created(entry, "Points awarded").into_response())
}

pub async fn get_point_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let balance = state.points.balance(user_id).await?;

    Ok(success(balance, "Point balance fetched").into_response())
}

pub async fn get_expiring_points(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let expiring = state.points.expiring_soon(user_id).await?;

    Ok(success(expiring, "Expiring points fetched").into_response())
}

#[derive(Deserialize)]
pub struct IssueCouponBody {
    pub user_id: Uuid,
    pub discount_amount: i64,
    pub valid_days: i64,
    pub code: Option<String>,
}

pub async fn issue_coupon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IssueCouponBody>,
) -> Result<Response, AppError> {
    actor_id(&headers)?;
    let coupon = state
        .provisioning
        .issue_coupon(body.user_id, body.discount_amount, body.valid_days, body.code)
        .await?;

    Ok(created(coupon, "Coupon issued").into_response())
}

pub async fn list_my_coupons(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = actor_id(&headers)?;
    let coupons = state.provisioning.user_coupons(user_id).await?;

    Ok(success(coupons, "Coupons fetched").into_response())
}
