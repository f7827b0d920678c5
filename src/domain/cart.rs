use serde::{Deserialize, Serialize};

use super::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self { product_id, quantity }
    }
}

/// Quantity held for `product_id` across the cart.
pub fn quantity_in_cart(items: &[CartItem], product_id: &ProductId) -> u32 {
    items
        .iter()
        .filter(|item| &item.product_id == product_id)
        .fold(0u32, |total, item| total.saturating_add(item.quantity))
}

impl From<&CartItem> for super::Selection {
    fn from(item: &CartItem) -> Self {
        super::Selection::new(item.product_id, item.quantity)
    }
}
