//! Cart API
//!
//! Every mutation responds with the full recomputed [`CartQuote`], so
//! the client never derives amounts itself.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use shared::cart::{DeliveryType, NewCartItem, PaymentType};
use shared::error::AppResult;
use shared::util::now_millis;

use super::extract::CurrentUser;
use crate::core::ServerState;
use crate::services::CartQuote;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", cart_routes())
}

fn cart_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route(
            "/items/{line_id}",
            put(update_quantity).delete(remove_item),
        )
        .route("/tip", put(set_tip))
        .route("/delivery-type", put(set_delivery_type))
        .route("/payment-type", put(set_payment_type))
        .route("/location", put(set_location))
        .route("/promo", post(apply_promo).delete(clear_promo))
        .route("/coupon", post(apply_coupon).delete(clear_coupon))
}

// ==================== Request Bodies ====================

#[derive(Deserialize)]
struct QuantityBody {
    quantity: i32,
}

#[derive(Deserialize)]
struct TipBody {
    amount: f64,
}

#[derive(Deserialize)]
struct DeliveryTypeBody {
    delivery_type: DeliveryType,
}

#[derive(Deserialize)]
struct PaymentTypeBody {
    payment_type: PaymentType,
}

#[derive(Deserialize)]
struct LocationBody {
    location_id: String,
}

#[derive(Deserialize)]
struct PromoBody {
    code: String,
}

#[derive(Deserialize)]
struct CouponBody {
    coupon_id: String,
}

// ==================== Handlers ====================

/// GET /api/cart - current cart with all derived amounts
async fn get_cart(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.quote(&user_id)))
}

/// DELETE /api/cart - empty the cart (location and delivery type kept)
async fn clear_cart(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.clear(&user_id)?))
}

/// POST /api/cart/items - add an item, merging identical configurations
async fn add_item(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(item): Json<NewCartItem>,
) -> AppResult<Json<CartQuote>> {
    let (_, quote) = state.carts.add_item(&user_id, item)?;
    Ok(Json(quote))
}

/// PUT /api/cart/items/:line_id - set a line's quantity (0 removes it)
async fn update_quantity(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<String>,
    Json(body): Json<QuantityBody>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.update_quantity(&user_id, &line_id, body.quantity)?))
}

/// DELETE /api/cart/items/:line_id
async fn remove_item(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<String>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.remove_item(&user_id, &line_id)?))
}

/// PUT /api/cart/tip - tip is clamped to [0, 200], never rejected
async fn set_tip(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<TipBody>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.set_tip(&user_id, body.amount)?))
}

/// PUT /api/cart/delivery-type
async fn set_delivery_type(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<DeliveryTypeBody>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.set_delivery_type(&user_id, body.delivery_type)?))
}

/// PUT /api/cart/payment-type
async fn set_payment_type(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<PaymentTypeBody>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.set_payment_type(&user_id, body.payment_type)?))
}

/// PUT /api/cart/location - bind the cart to a store location
async fn set_location(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<LocationBody>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.set_location(&user_id, &body.location_id)?))
}

/// POST /api/cart/promo - validate and apply a promo code
async fn apply_promo(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<PromoBody>,
) -> AppResult<Json<CartQuote>> {
    let subtotal = state.carts.quote(&user_id).subtotal;
    let accepted = state
        .promos
        .validate(&user_id, &body.code, subtotal, now_millis())?;
    Ok(Json(state.carts.apply_promo(&user_id, &accepted)?))
}

/// DELETE /api/cart/promo
async fn clear_promo(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.clear_promo(&user_id)?))
}

/// POST /api/cart/coupon - attach one of the user's loyalty coupons
async fn apply_coupon(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CouponBody>,
) -> AppResult<Json<CartQuote>> {
    let coupon = state
        .loyalty
        .coupon_for_cart(&user_id, &body.coupon_id, now_millis())?;
    Ok(Json(state.carts.apply_coupon(&user_id, coupon)?))
}

/// DELETE /api/cart/coupon
async fn clear_coupon(
    State(state): State<ServerState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.carts.clear_coupon(&user_id)?))
}
