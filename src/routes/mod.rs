use axum::{
    routing::{get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    award_points, cancel_transaction, check_in, confirm_transaction, create_category,
    create_event, create_transaction, create_voucher, get_expiring_points, get_point_balance,
    get_transaction, health_check, issue_coupon, list_event_attendees, list_event_categories,
    list_events, list_my_coupons, list_my_transactions, reject_transaction, submit_payment_proof,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(create_event).get(list_events))
        .route(
            "/events/:id/categories",
            post(create_category).get(list_event_categories),
        )
        .route("/events/:id/vouchers", post(create_voucher))
        .route("/events/:id/attendees", get(list_event_attendees))
        .route(
            "/transactions",
            post(create_transaction).get(list_my_transactions),
        )
        .route("/transactions/:id", get(get_transaction))
        .route("/transactions/:id/payment-proof", post(submit_payment_proof))
        .route("/transactions/:id/confirm", post(confirm_transaction))
        .route("/transactions/:id/reject", post(reject_transaction))
        .route("/transactions/:id/cancel", post(cancel_transaction))
        .route("/check-in/:token", post(check_in))
        .route("/coupons", post(issue_coupon).get(list_my_coupons))
        .route("/points/award", post(award_points))
        .route("/points/balance", get(get_point_balance))
        .route("/points/expiring", get(get_expiring_points))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
