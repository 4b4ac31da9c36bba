use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::actor_id;
use crate::models::DiscountKind;
use crate::services::{NewEventRequest, NewVoucherRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct CreateEventBody {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateEventBody>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let event = state
        .provisioning
        .create_event(
            organizer_id,
            NewEventRequest {
                title: body.title,
                description: body.description,
                location: body.location,
                start_time: body.start_time,
                end_time: body.end_time,
            },
        )
        .await?;

    Ok(created(event, "Event created").into_response())
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.provisioning.list_events().await?;

    Ok(success(events, "Events fetched").into_response())
}

pub async fn list_event_categories(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let categories = state.provisioning.event_categories(event_id).await?;

    Ok(success(categories, "Ticket categories fetched").into_response())
}

#[derive(Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
    pub price: i64,
    pub total_seats: i32,
}

pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let category = state
        .provisioning
        .create_category(organizer_id, event_id, body.name, body.price, body.total_seats)
        .await?;

    Ok(created(category, "Ticket category created").into_response())
}

#[derive(Deserialize)]
pub struct CreateVoucherBody {
    pub code: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: i32,
}

pub async fn create_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Json(body): Json<CreateVoucherBody>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let voucher = state
        .provisioning
        .create_voucher(
            organizer_id,
            event_id,
            NewVoucherRequest {
                code: body.code,
                discount_kind: body.discount_kind,
                discount_amount: body.discount_amount,
                valid_from: body.valid_from,
                valid_to: body.valid_to,
                usage_limit: body.usage_limit,
            },
        )
        .await?;

    Ok(created(voucher, "Voucher created").into_response())
}

pub async fn list_event_attendees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let organizer_id = actor_id(&headers)?;
    let attendees = state
        .provisioning
        .attendees_for_event(organizer_id, event_id)
        .await?;

    Ok(success(attendees, "Attendees fetched").into_response())
}
