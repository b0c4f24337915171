//! Checkout API
//!
//! `/notify` is the payment provider's callback. It carries its own
//! signature instead of a user header, so it stays outside the
//! authenticated surface.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use shared::cart::CheckoutEligibility;
use shared::error::AppResult;
use shared::util::now_millis;

use super::extract::CurrentUser;
use crate::core::ServerState;
use crate::services::{CheckoutOutcome, OrderStatus, PaymentNotification};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", checkout_routes())
}

fn checkout_routes() -> Router<ServerState> {
    Router::new()
        .route("/eligibility", get(eligibility))
        .route("/", post(place_order))
        .route("/notify", post(payment_notification))
}

#[derive(Serialize)]
struct NotificationResponse {
    status: OrderStatus,
}

/// GET /api/checkout/eligibility - the advisory gate for the UI
async fn eligibility(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CheckoutEligibility>> {
    Ok(Json(state.carts.quote(&user_id).checkout))
}

/// POST /api/checkout - place an order from the current cart
async fn place_order(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CheckoutOutcome>> {
    Ok(Json(state.checkout.place_order(&user_id, now_millis())?))
}

/// POST /api/checkout/notify - signed callback from the payment provider
async fn payment_notification(
    State(state): State<ServerState>,
    Json(notification): Json<PaymentNotification>,
) -> AppResult<Json<NotificationResponse>> {
    let status = state.checkout.handle_notification(&notification, now_millis())?;
    Ok(Json(NotificationResponse { status }))
}
