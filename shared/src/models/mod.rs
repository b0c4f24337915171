//! Domain models shared between server and clients

mod location;
mod loyalty;
mod promo;

pub use location::StoreLocation;
pub use loyalty::{
    CouponStatus, CouponType, LedgerEntry, LedgerReason, LoyaltyAccount, LoyaltyCoupon,
    LoyaltyReward, StoredCoupon,
};
pub use promo::{DiscountType, PromoAcceptance, PromoCode, PromoDefinition};
