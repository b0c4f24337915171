//! Loyalty API

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;
use shared::error::AppResult;
use shared::models::{LedgerEntry, LoyaltyAccount, LoyaltyCoupon, LoyaltyReward};
use shared::util::now_millis;

use super::extract::CurrentUser;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/loyalty", loyalty_routes())
}

fn loyalty_routes() -> Router<ServerState> {
    Router::new()
        .route("/account", get(get_account))
        .route("/rewards", get(list_rewards))
        .route("/rewards/{id}/activate", post(activate_reward))
        .route("/coupon", get(get_active_coupon))
        .route("/ledger", get(get_ledger))
}

#[derive(Serialize)]
struct ActiveCouponResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon: Option<LoyaltyCoupon>,
}

/// GET /api/loyalty/account - points balance and tier
async fn get_account(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<LoyaltyAccount>> {
    Ok(Json(state.loyalty.account(&user_id)?))
}

/// GET /api/loyalty/rewards - the active reward catalog
async fn list_rewards(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<LoyaltyReward>>> {
    Ok(Json(state.loyalty.rewards()?))
}

/// POST /api/loyalty/rewards/:id/activate - exchange points for a coupon
async fn activate_reward(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(reward_id): Path<String>,
) -> AppResult<Json<LoyaltyCoupon>> {
    Ok(Json(state.loyalty.activate(&user_id, &reward_id, now_millis())?))
}

/// GET /api/loyalty/coupon - the user's active coupon, if any
async fn get_active_coupon(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<ActiveCouponResponse>> {
    let coupon = state.loyalty.active_coupon(&user_id, now_millis())?;
    Ok(Json(ActiveCouponResponse { coupon }))
}

/// GET /api/loyalty/ledger - the user's point movement history
async fn get_ledger(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    Ok(Json(state.loyalty.ledger(&user_id)?))
}
