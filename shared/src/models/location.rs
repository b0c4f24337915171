//! Store Location Model

use serde::{Deserialize, Serialize};

/// A store location; the source of the cart's minimum-order and
/// delivery-fee configuration once resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreLocation {
    pub id: String,
    pub name: String,
    pub min_order_value: f64,
    pub delivery_fee: f64,
    pub is_active: bool,
}
