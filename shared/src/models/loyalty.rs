//! Loyalty Models
//!
//! Coupons are pre-issued, points-redeemed reward tokens. Only coupon
//! consumption is in scope for pricing; point accrual happens elsewhere.

use serde::{Deserialize, Serialize};

/// What a loyalty coupon grants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    /// Waives the delivery fee (realized in the delivery-fee selector)
    FreeDelivery,
    /// Flat amount off the subtotal
    Discount,
    /// A free product; `discount_value` carries its priced value if any
    FreeProduct,
}

/// A redeemed coupon as carried in the cart (mutually exclusive with a
/// promo code)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoyaltyCoupon {
    pub id: String,
    /// Redemption code shown to the kitchen/operator
    pub code: String,
    pub coupon_type: CouponType,
    /// Monetary value; meaningful for DISCOUNT and optionally FREE_PRODUCT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_product_name: Option<String>,
    /// Expiry timestamp (millis)
    pub expires_at: i64,
}

/// Coupon lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    #[default]
    Active,
    Used,
    Expired,
}

/// Coupon row as stored server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCoupon {
    pub coupon: LoyaltyCoupon,
    pub user_id: String,
    pub status: CouponStatus,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,
}

impl StoredCoupon {
    pub fn is_active(&self) -> bool {
        self.status == CouponStatus::Active
    }
}

/// Loyalty account (points ledger head)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    pub user_id: String,
    pub points_balance: i64,
    /// Tier rank, 0-based; rewards may require a minimum rank
    pub tier_rank: u8,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Redeemable reward definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyReward {
    pub id: String,
    pub name: String,
    pub coupon_type: CouponType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_product_name: Option<String>,
    pub points_cost: i64,
    /// Minimum tier rank required to redeem
    #[serde(default)]
    pub min_tier_rank: u8,
    /// Coupon validity in days from activation
    pub valid_days: u32,
    pub is_active: bool,
}

/// Why a ledger entry was written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerReason {
    /// Points deducted for a coupon activation
    CouponActivated,
    /// Compensating re-credit after a failed activation
    ActivationRolledBack,
}

/// Point movement audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    /// Signed point delta (negative = deduction)
    pub delta: i64,
    pub reason: LedgerReason,
    /// Coupon this movement relates to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_coupon_active_only_in_active_status() {
        let mut stored = StoredCoupon {
            coupon: LoyaltyCoupon {
                id: "c-1".to_string(),
                code: "RW-TESTTEST42".to_string(),
                coupon_type: CouponType::FreeDelivery,
                discount_value: None,
                free_product_name: None,
                expires_at: i64::MAX,
            },
            user_id: "user-1".to_string(),
            status: CouponStatus::Active,
            created_at: 0,
            used_at: None,
        };
        assert!(stored.is_active());

        stored.status = CouponStatus::Used;
        assert!(!stored.is_active());
        stored.status = CouponStatus::Expired;
        assert!(!stored.is_active());
    }
}
