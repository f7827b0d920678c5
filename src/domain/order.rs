use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::round_money;
use super::{CustomerId, IdempotencyKey, OrderId, PaymentId, PaymentMethod, PrescriptionId, ProductId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Completed,
}

impl OrderStatus {
    /// Statuses shown in the admin "active fulfillment" view.
    pub fn is_admin_visible(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Admin transitions after confirmation.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Completed)
                | (Confirmed, Cancelled)
                | (Shipped, Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderOrigin {
    Prescription,
    Pos,
    Online,
}

/// One product line. `stock_snapshot` bounds the quantity the customer may pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub stock_snapshot: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Drives the enabled state of the "+" control.
    pub fn can_increase(&self) -> bool {
        self.quantity < self.stock_snapshot
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub prescription_id: Option<PrescriptionId>,
    pub origin: OrderOrigin,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub customization_confirmed: bool,
    /// Set while a checkout attempt is charging this order; edits are refused until it clears.
    pub payment_hold: Option<IdempotencyKey>,
    pub payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    pub fn item(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Recompute subtotal, tax and total from the line items.
    pub fn recompute_totals(&mut self) {
        self.subtotal = round_money(self.items.iter().map(LineItem::line_total).sum());
        self.tax = round_money(self.subtotal * self.tax_rate);
        self.total = self.subtotal + self.shipping + self.tax;
    }

    /// True when the order is visible to `customer`.
    pub fn belongs_to(&self, customer: &CustomerId) -> bool {
        &self.customer_id == customer
    }

    /// Case-insensitive match over id, customer and item names.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.id.to_string().contains(&needle)
            || self.customer_id.as_str().contains(&needle)
            || self.items.iter().any(|item| item.name.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub customer_id: CustomerId,
    pub prescription_id: Option<PrescriptionId>,
    pub origin: OrderOrigin,
    pub items: Vec<LineItem>,
    pub shipping: Decimal,
    pub tax_rate: Decimal,
    pub payment_method: PaymentMethod,
}

/// Admin listing query. Pages are 1-based.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

/// A pharmacist's (or cart's) pick of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl Selection {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self { product_id, quantity }
    }
}
