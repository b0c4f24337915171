//! Shared domain types for the storefront
//!
//! This crate holds everything both the server and its tests agree on:
//! the cart pricing engine ([`cart`]), the promo/loyalty/location models
//! ([`models`]), the unified error system ([`error`]) and small utilities.

pub mod cart;
pub mod error;
pub mod models;
pub mod util;
