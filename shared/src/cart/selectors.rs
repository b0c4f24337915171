//! Cart price selectors
//!
//! Pure derivation functions over [`CartState`] with support for:
//! - Line subtotals (variant delta and addons scale with quantity)
//! - Delivery and pay-on-pickup fees
//! - Promo / loyalty coupon discounts
//! - The checkout-eligibility gate
//!
//! Uses rust_decimal for precision calculations; the UI reads these at
//! high frequency, so every selector is a standalone function over
//! `&CartState` with no store involved.

use super::state::{CartState, DeliveryType, PaymentType};
use crate::models::{CouponType, DiscountType};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Total unit count across all lines
pub fn item_count(state: &CartState) -> i32 {
    state.items.iter().map(|l| l.quantity).sum()
}

/// Order subtotal.
///
/// Per line: `(unit_price + variant_delta + Σ addon.price) × quantity`.
/// The addon sum is computed once per line and the whole bracket scales
/// with quantity.
pub fn subtotal(state: &CartState) -> f64 {
    let mut sum = Decimal::ZERO;
    for line in &state.items {
        let addons: Decimal = line.addons.iter().map(|a| to_decimal(a.price)).sum();
        let per_unit =
            to_decimal(line.unit_price) + to_decimal(line.variant_price_delta.unwrap_or(0.0));
        sum += (per_unit + addons) * Decimal::from(line.quantity);
    }
    to_f64(sum)
}

/// Delivery fee. Zero for pickup and whenever a free-delivery promo or
/// coupon is active; this is the only place free delivery is realized.
pub fn delivery_fee(state: &CartState) -> f64 {
    if state.delivery_type == DeliveryType::Pickup {
        return 0.0;
    }
    if let Some(promo) = &state.promo_code {
        if promo.discount_type == DiscountType::FreeDelivery {
            return 0.0;
        }
    }
    if let Some(coupon) = &state.loyalty_coupon {
        if coupon.coupon_type == CouponType::FreeDelivery {
            return 0.0;
        }
    }
    state.base_delivery_fee
}

/// Pay-on-pickup surcharge
pub fn payment_fee(state: &CartState) -> f64 {
    if state.payment_type == PaymentType::PayOnPickup {
        state.pay_on_pickup_fee
    } else {
        0.0
    }
}

/// Discount amount against the subtotal.
///
/// Promo takes precedence over the coupon. The mutators keep the two
/// mutually exclusive, but the ordering here must hold even for state
/// built without the mutators, so do not reorder the checks.
/// Free-delivery variants contribute nothing here; their effect lives
/// entirely in [`delivery_fee`] so it is never counted twice.
pub fn discount(state: &CartState) -> f64 {
    if let Some(promo) = &state.promo_code {
        return match promo.discount_type {
            DiscountType::Percent => {
                let amount =
                    to_decimal(subtotal(state)) * to_decimal(promo.discount_value)
                        / Decimal::ONE_HUNDRED;
                to_f64(amount)
            }
            DiscountType::Fixed => promo.discount_value,
            DiscountType::FreeDelivery => 0.0,
        };
    }
    if let Some(coupon) = &state.loyalty_coupon {
        return match coupon.coupon_type {
            CouponType::Discount => coupon.discount_value.unwrap_or(0.0),
            CouponType::FreeDelivery => 0.0,
            // Priced value of the free item, when the reward carries one
            CouponType::FreeProduct => coupon.discount_value.unwrap_or(0.0),
        };
    }
    0.0
}

/// Grand total, floored at zero: discounts can never make the order
/// negative.
pub fn total(state: &CartState) -> f64 {
    let amount = to_decimal(subtotal(state)) - to_decimal(discount(state))
        + to_decimal(delivery_fee(state))
        + to_decimal(payment_fee(state))
        + to_decimal(state.tip);
    to_f64(amount.max(Decimal::ZERO))
}

/// Checkout-eligibility verdict. The reason is advisory display text,
/// never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutEligibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckoutEligibility {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// The gate before order placement. Fails closed on an empty cart or a
/// subtotal below the location's minimum order value.
pub fn can_checkout(state: &CartState) -> CheckoutEligibility {
    if state.items.is_empty() {
        return CheckoutEligibility::blocked("cart is empty");
    }
    let sub = subtotal(state);
    if sub < state.min_order_value {
        let short = to_f64(to_decimal(state.min_order_value) - to_decimal(sub));
        return CheckoutEligibility::blocked(format!(
            "minimum order value is {:.2}, short by {:.2}",
            state.min_order_value, short
        ));
    }
    CheckoutEligibility::allowed()
}

// ==================== Tests ====================
