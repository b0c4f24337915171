//! Cart domain: line items, mutable cart state and pure price selectors.
//!
//! The state machine in [`state`] owns every mutation (merge-on-add,
//! promo/coupon exclusivity, tip clamping); [`selectors`] derives every
//! displayed amount from a `&CartState` snapshot. Nothing in here talks
//! to storage.

pub mod item;
pub mod selectors;
pub mod state;

pub use item::{generate_merge_key, CartAddon, CartLineItem, NewCartItem};
pub use selectors::CheckoutEligibility;
pub use state::{
    CartState, DeliveryType, PaymentType, PersistedCart, FALLBACK_DELIVERY_FEE,
    FALLBACK_MIN_ORDER_VALUE,
};
