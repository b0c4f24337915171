//! Unified error codes for the storefront
//!
//! Error codes are shared between the server and its clients and are
//! organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Cart errors
//! - 3xxx: Promo code errors
//! - 4xxx: Loyalty errors
//! - 5xxx: Payment errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,

    // ==================== 2xxx: Cart ====================
    /// Cart session not found
    CartNotFound = 2001,
    /// Cart is empty
    CartEmpty = 2002,
    /// Cart line item not found
    CartItemNotFound = 2003,

    // ==================== 3xxx: Promo ====================
    /// Promo code not found
    PromoNotFound = 3001,
    /// Promo code is inactive
    PromoInactive = 3002,
    /// Promo code has expired
    PromoExpired = 3003,
    /// Promo code is not yet valid
    PromoNotYetValid = 3004,
    /// Order subtotal below the promo's minimum
    PromoBelowMinimum = 3005,
    /// Promo usage limit exhausted
    PromoUsageExhausted = 3006,
    /// Promo is restricted to first orders
    PromoFirstOrderOnly = 3007,

    // ==================== 4xxx: Loyalty ====================
    /// Loyalty reward not found
    RewardNotFound = 4001,
    /// Loyalty account not found
    LoyaltyAccountNotFound = 4002,
    /// User already has an active coupon
    CouponAlreadyActive = 4003,
    /// Insufficient loyalty point balance
    InsufficientPoints = 4004,
    /// Loyalty tier too low for this reward
    TierTooLow = 4005,
    /// Coupon not found
    CouponNotFound = 4006,
    /// Coupon has expired
    CouponExpired = 4007,
    /// Coupon has already been used
    CouponAlreadyUsed = 4008,

    // ==================== 5xxx: Payment ====================
    /// Transaction registration with the gateway failed
    PaymentRegistrationFailed = 5001,
    /// Gateway notification signature is invalid
    PaymentInvalidSignature = 5002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",

            // Cart
            ErrorCode::CartNotFound => "Cart session not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::CartItemNotFound => "Cart line item not found",

            // Promo
            ErrorCode::PromoNotFound => "Promo code not found",
            ErrorCode::PromoInactive => "Promo code is inactive",
            ErrorCode::PromoExpired => "Promo code has expired",
            ErrorCode::PromoNotYetValid => "Promo code is not yet valid",
            ErrorCode::PromoBelowMinimum => "Order subtotal is below the promo minimum",
            ErrorCode::PromoUsageExhausted => "Promo code usage limit has been reached",
            ErrorCode::PromoFirstOrderOnly => "Promo code is only valid on a first order",

            // Loyalty
            ErrorCode::RewardNotFound => "Loyalty reward not found",
            ErrorCode::LoyaltyAccountNotFound => "Loyalty account not found",
            ErrorCode::CouponAlreadyActive => "An active coupon already exists",
            ErrorCode::InsufficientPoints => "Insufficient loyalty point balance",
            ErrorCode::TierTooLow => "Loyalty tier is too low for this reward",
            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponAlreadyUsed => "Coupon has already been used",

            // Payment
            ErrorCode::PaymentRegistrationFailed => "Transaction registration failed",
            ErrorCode::PaymentInvalidSignature => "Payment notification signature is invalid",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Cart
            2001 => Ok(ErrorCode::CartNotFound),
            2002 => Ok(ErrorCode::CartEmpty),
            2003 => Ok(ErrorCode::CartItemNotFound),

            // Promo
            3001 => Ok(ErrorCode::PromoNotFound),
            3002 => Ok(ErrorCode::PromoInactive),
            3003 => Ok(ErrorCode::PromoExpired),
            3004 => Ok(ErrorCode::PromoNotYetValid),
            3005 => Ok(ErrorCode::PromoBelowMinimum),
            3006 => Ok(ErrorCode::PromoUsageExhausted),
            3007 => Ok(ErrorCode::PromoFirstOrderOnly),

            // Loyalty
            4001 => Ok(ErrorCode::RewardNotFound),
            4002 => Ok(ErrorCode::LoyaltyAccountNotFound),
            4003 => Ok(ErrorCode::CouponAlreadyActive),
            4004 => Ok(ErrorCode::InsufficientPoints),
            4005 => Ok(ErrorCode::TierTooLow),
            4006 => Ok(ErrorCode::CouponNotFound),
            4007 => Ok(ErrorCode::CouponExpired),
            4008 => Ok(ErrorCode::CouponAlreadyUsed),

            // Payment
            5001 => Ok(ErrorCode::PaymentRegistrationFailed),
            5002 => Ok(ErrorCode::PaymentInvalidSignature),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::CartEmpty,
            ErrorCode::PromoUsageExhausted,
            ErrorCode::InsufficientPoints,
            ErrorCode::PaymentInvalidSignature,
            ErrorCode::DatabaseError,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code_rejected() {
        assert_eq!(ErrorCode::try_from(777), Err(InvalidErrorCode(777)));
    }

    #[test]
    fn test_serde_as_u16() {
        let json = serde_json::to_string(&ErrorCode::PromoExpired).unwrap();
        assert_eq!(json, "3003");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::PromoExpired);
    }
}
