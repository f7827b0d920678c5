use crate::domain::{IdempotencyKey, LineItem, OrderStatus, PaymentId, ProductId};

/// Mutations of an order after it has been created.
///
/// Item edits are only accepted while `customization_confirmed` is false;
/// status transitions only after it has become true.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Adds one unit. A no-op once the stock snapshot is reached.
    IncreaseQuantity(ProductId),
    /// Removes one unit; the line disappears at zero.
    DecreaseQuantity(ProductId),
    RemoveItem(ProductId),
    /// Replaces every line item at once.
    ReplaceItems(Vec<LineItem>),
    HoldForPayment { key: IdempotencyKey },
    ReleaseHold { key: IdempotencyKey },
    /// Locks the order against edits and records the payment that paid for it.
    Confirm { payment_id: PaymentId },
    TransitionStatus(OrderStatus),
}
