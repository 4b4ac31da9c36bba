//! Thin HTTP glue over the services. Handlers parse input, resolve the
//! acting user from the `x-user-id` header (authentication itself lives
//! in front of this service) and translate service results into the
//! JSON envelope.

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod checkin;
pub mod events;
pub mod points;
pub mod transactions;

pub use checkin::check_in;
pub use events::{
    create_category, create_event, create_voucher, list_event_attendees, list_event_categories,
    list_events,
};
pub use points::{
    award_points, get_expiring_points, get_point_balance, issue_coupon, list_my_coupons,
};
pub use transactions::{
    cancel_transaction, confirm_transaction, create_transaction, get_transaction,
    list_my_transactions, reject_transaction, submit_payment_proof,
};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "panggung-api",
    };

    success(payload, "Health check successful").into_response()
}

/// The acting user, from the `x-user-id` header the auth proxy sets.
pub(crate) fn actor_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get("x-user-id")
        .ok_or_else(|| AppError::Unauthorized("missing x-user-id header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed x-user-id header".into()))?;

    Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized("x-user-id is not a valid id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_id_requires_a_well_formed_uuid() {
        let mut headers = HeaderMap::new();
        assert!(actor_id(&headers).is_err());

        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(actor_id(&headers).is_err());

        let id = Uuid::new_v4();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(actor_id(&headers).unwrap(), id);
    }
}
