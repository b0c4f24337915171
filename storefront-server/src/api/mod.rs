//! API routes
//!
//! # Structure
//!
//! - [`health`] - health check and store locations (public)
//! - [`cart`] - cart reads and mutations
//! - [`loyalty`] - account, rewards, coupons, ledger
//! - [`checkout`] - order placement and the payment callback
//!
//! Authenticated routes take the user identity from the `X-User-Id`
//! header via the [`extract::CurrentUser`] extractor; the hosted auth
//! layer in front of this service is responsible for verifying it.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub mod cart;
pub mod checkout;
pub mod extract;
pub mod health;
pub mod loyalty;

pub use extract::CurrentUser;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(cart::router())
        .merge(loyalty::router())
        .merge(checkout::router())
}

/// Build the fully configured application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // CORS - the storefront runs on a different origin
        .layer(CorsLayer::permissive())
        // Trace - request logging at INFO level
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
