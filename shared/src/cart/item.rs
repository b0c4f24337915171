//! Cart line items
//!
//! A line item is one product configuration in the cart. Identical
//! configurations added twice must merge into one line, so each item
//! carries a content-addressed merge key over its identity-defining
//! fields; the line id appends the insertion timestamp so distinct
//! insertions of distinct configurations stay distinct rows.

use serde::{Deserialize, Serialize};

/// One addon attached to a line item
///
/// Insertion order is preserved for display only; it does not affect
/// the merge key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartAddon {
    pub id: String,
    pub name: String,
    pub price: f64,
}

/// One row in the cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    /// Line id: merge key + insertion timestamp
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    /// Always >= 1; a request to set it lower removes the line instead
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_price_delta: Option<f64>,
    /// 1 (mild) to 3 (hot)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub addons: Vec<CartAddon>,
}

/// Add-item input, before a line id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_price_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub addons: Vec<CartAddon>,
}

impl NewCartItem {
    /// Merge key over the identity-defining fields
    pub fn merge_key(&self) -> String {
        generate_merge_key(
            &self.product_id,
            self.variant_id.as_deref(),
            self.spice_level,
            &self.addons,
        )
    }

    /// Build a line from this input.
    ///
    /// Quantity is floored at 1 so a line can never be created in a
    /// removed-but-present state.
    pub fn into_line(self, now_millis: i64) -> CartLineItem {
        let id = format!("{}-{}", self.merge_key(), now_millis);
        CartLineItem {
            id,
            product_id: self.product_id,
            name: self.name,
            unit_price: self.unit_price,
            quantity: self.quantity.max(1),
            variant_id: self.variant_id,
            variant_name: self.variant_name,
            variant_price_delta: self.variant_price_delta,
            spice_level: self.spice_level,
            notes: self.notes,
            image: self.image,
            addons: self.addons,
        }
    }
}

impl CartLineItem {
    /// Merge key over the identity-defining fields
    pub fn merge_key(&self) -> String {
        generate_merge_key(
            &self.product_id,
            self.variant_id.as_deref(),
            self.spice_level,
            &self.addons,
        )
    }
}

/// Generate a content-addressed merge key from a line's identity-defining
/// properties: product, variant, spice level and addon set.
///
/// Lines with the same merge key represent the same configuration and are
/// merged (quantities added together). Quantity, notes and display fields
/// deliberately do not participate.
pub fn generate_merge_key(
    product_id: &str,
    variant_id: Option<&str>,
    spice_level: Option<u8>,
    addons: &[CartAddon],
) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();

    hasher.update(product_id.as_bytes());
    hasher.update([0u8]);

    if let Some(variant) = variant_id {
        hasher.update(variant.as_bytes());
    }
    hasher.update([0u8]);

    if let Some(level) = spice_level {
        hasher.update([level]);
    }

    // Addon order is display-only; sort ids so reordered addon lists
    // still merge.
    let mut addon_keys: Vec<(&str, f64)> =
        addons.iter().map(|a| (a.id.as_str(), a.price)).collect();
    addon_keys.sort_by(|a, b| a.0.cmp(b.0));
    for (id, price) in addon_keys {
        hasher.update(id.as_bytes());
        hasher.update(price.to_be_bytes());
    }

    let result = hasher.finalize();
    hex::encode(&result[..16]) // First 16 bytes for a shorter key
}
