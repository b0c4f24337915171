//! Business services
//!
//! Each service wraps [`StorefrontStorage`](crate::storage::StorefrontStorage)
//! with one domain's rules:
//!
//! - [`cart`] - per-user cart sessions with write-through persistence
//! - [`promo`] - promo code validation and redemption
//! - [`loyalty`] - reward activation, points and coupons
//! - [`payment`] - hosted-checkout gateway boundary
//! - [`checkout`] - order placement and finalization

pub mod cart;
pub mod checkout;
pub mod loyalty;
pub mod payment;
pub mod promo;

pub use cart::{CartQuote, CartService};
pub use checkout::{CheckoutOutcome, CheckoutService, OrderDraft, OrderStatus};
pub use loyalty::LoyaltyService;
pub use payment::{HostedCheckoutGateway, PaymentGateway, PaymentNotification, RedirectToken};
pub use promo::PromoService;
