//! Promo Code Models

use serde::{Deserialize, Serialize};

/// How a promo code discounts the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Percentage of the subtotal
    Percent,
    /// Flat amount off the subtotal
    Fixed,
    /// Waives the delivery fee (realized in the delivery-fee selector,
    /// never in the discount amount)
    FreeDelivery,
}

/// An active, already-validated promo code as carried in the cart.
///
/// Installed only through a successful validation round-trip; the cart
/// trusts this shape verbatim and performs no re-validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoCode {
    /// Code as entered, normalized to uppercase
    pub code: String,
    /// Meaning depends on `discount_type`: percent points or flat amount
    pub discount_value: f64,
    pub discount_type: DiscountType,
}

impl PromoCode {
    pub fn new(code: impl Into<String>, discount_value: f64, discount_type: DiscountType) -> Self {
        Self {
            code: code.into().to_uppercase(),
            discount_value,
            discount_type,
        }
    }
}

/// Promo code definition as stored server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoDefinition {
    /// Uppercase code, unique
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Free product granted alongside the discount, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_product_id: Option<String>,
    pub is_active: bool,
    /// Validity window start (millis), open when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<i64>,
    /// Validity window end (millis), open when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<i64>,
    /// Minimum order subtotal required to redeem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_value: Option<f64>,
    /// Total number of redemptions allowed, unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    /// Redemptions so far
    #[serde(default)]
    pub usage_count: u32,
    /// Only redeemable on a user's first order
    #[serde(default)]
    pub first_order_only: bool,
    pub created_at: i64,
}

/// Successful validation result handed back to the cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoAcceptance {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_product_id: Option<String>,
}

impl From<&PromoDefinition> for PromoAcceptance {
    fn from(def: &PromoDefinition) -> Self {
        Self {
            code: def.code.clone(),
            discount_type: def.discount_type,
            discount_value: def.discount_value,
            free_product_id: def.free_product_id.clone(),
        }
    }
}
