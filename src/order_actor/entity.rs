use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::actor_framework::Entity;
use crate::domain::{LineItem, Order, OrderCreate, OrderId, OrderStatus, ProductId};
use super::actions::OrderAction;
use super::error::OrderError;

fn validate_items(items: &[LineItem]) -> Result<(), OrderError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.product_id) {
            return Err(OrderError::ValidationError(format!("product {} appears twice", item.product_id)));
        }
        if item.quantity == 0 {
            return Err(OrderError::ValidationError(format!("quantity for {} must be at least 1", item.name)));
        }
        if item.quantity > item.stock_snapshot {
            return Err(OrderError::InsufficientStock {
                product: item.name.clone(),
                requested: item.quantity,
                available: item.stock_snapshot,
            });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(OrderError::ValidationError(format!("price for {} must be non-negative", item.name)));
        }
    }
    Ok(())
}

impl Order {
    fn ensure_editable(&self) -> Result<(), OrderError> {
        if self.customization_confirmed {
            return Err(OrderError::Locked(format!("order {} is already confirmed", self.id)));
        }
        if self.payment_hold.is_some() {
            return Err(OrderError::Locked(format!("order {} is being paid for", self.id)));
        }
        Ok(())
    }

    fn line_index(&self, product_id: &ProductId) -> Result<usize, OrderError> {
        self.items
            .iter()
            .position(|item| &item.product_id == product_id)
            .ok_or_else(|| OrderError::ItemNotFound(product_id.to_string()))
    }
}

impl Entity for Order {
    type Id = OrderId;
    type CreateParams = OrderCreate;
    type Patch = ();
    type Action = OrderAction;
    type ActionResult = Order;
    type Error = OrderError;

    fn id(&self) -> &OrderId { &self.id }
    fn version(&self) -> u64 { self.version }
    fn set_version(&mut self, version: u64) { self.version = version; }

    /// Creates a draft order: status pending, not yet confirmed.
    ///
    /// # Errors
    /// Fails without creating anything if any line exceeds its stock snapshot.
    fn from_create_params(id: OrderId, params: OrderCreate) -> Result<Self, OrderError> {
        if params.items.is_empty() {
            return Err(OrderError::ValidationError("an order needs at least one item".to_string()));
        }
        validate_items(&params.items)?;
        if params.shipping < Decimal::ZERO || params.tax_rate < Decimal::ZERO {
            return Err(OrderError::ValidationError("shipping and tax must be non-negative".to_string()));
        }

        let now = Utc::now();
        let mut order = Self {
            id,
            customer_id: params.customer_id,
            prescription_id: params.prescription_id,
            origin: params.origin,
            items: params.items,
            subtotal: Decimal::ZERO,
            shipping: params.shipping,
            tax_rate: params.tax_rate,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            payment_method: params.payment_method,
            status: OrderStatus::Pending,
            customization_confirmed: false,
            payment_hold: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        order.recompute_totals();
        Ok(order)
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), OrderError> {
        Ok(())
    }

    /// Only draft orders with no checkout in flight may be deleted.
    fn on_delete(&self) -> Result<(), OrderError> {
        self.ensure_editable()
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<Order, OrderError> {
        match action {
            OrderAction::IncreaseQuantity(product_id) => {
                self.ensure_editable()?;
                let idx = self.line_index(&product_id)?;
                let item = &mut self.items[idx];
                if item.can_increase() {
                    item.quantity += 1;
                }
            }
            OrderAction::DecreaseQuantity(product_id) => {
                self.ensure_editable()?;
                let idx = self.line_index(&product_id)?;
                if self.items[idx].quantity <= 1 {
                    self.items.remove(idx);
                } else {
                    self.items[idx].quantity -= 1;
                }
            }
            OrderAction::RemoveItem(product_id) => {
                self.ensure_editable()?;
                let idx = self.line_index(&product_id)?;
                self.items.remove(idx);
            }
            OrderAction::ReplaceItems(items) => {
                self.ensure_editable()?;
                validate_items(&items)?;
                self.items = items;
            }
            OrderAction::HoldForPayment { key } => {
                if self.payment_hold.as_ref() == Some(&key) && !self.customization_confirmed {
                    return Ok(self.clone());
                }
                self.ensure_editable()?;
                if self.items.is_empty() {
                    return Err(OrderError::ValidationError("cannot pay for an empty order".to_string()));
                }
                self.payment_hold = Some(key);
            }
            OrderAction::ReleaseHold { key } => {
                if self.customization_confirmed || self.payment_hold.as_ref() != Some(&key) {
                    return Ok(self.clone());
                }
                self.payment_hold = None;
            }
            OrderAction::Confirm { payment_id } => {
                if self.customization_confirmed {
                    // A retried confirmation for the same payment is a no-op.
                    if self.payment_id == Some(payment_id) {
                        return Ok(self.clone());
                    }
                    return Err(OrderError::Locked(format!("order {} was confirmed by another payment", self.id)));
                }
                if self.status != OrderStatus::Pending {
                    return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Confirmed });
                }
                if self.items.is_empty() {
                    return Err(OrderError::ValidationError("cannot confirm an empty order".to_string()));
                }
                self.customization_confirmed = true;
                self.status = OrderStatus::Confirmed;
                self.payment_hold = None;
                self.payment_id = Some(payment_id);
            }
            OrderAction::TransitionStatus(next) => {
                if !self.customization_confirmed || !self.status.can_transition_to(next) {
                    return Err(OrderError::InvalidTransition { from: self.status, to: next });
                }
                self.status = next;
            }
        }
        self.recompute_totals();
        self.updated_at = Utc::now();
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::money_eq;
    use crate::domain::{CustomerId, IdempotencyKey, OrderOrigin, PaymentId, PaymentMethod};

    fn line(price: i64, quantity: u32, stock: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(),
            name: "Paracetamol".to_string(),
            unit_price: Decimal::new(price, 0),
            quantity,
            stock_snapshot: stock,
        }
    }

    fn draft(items: Vec<LineItem>) -> Result<Order, OrderError> {
        Order::from_create_params(
            OrderId::new(),
            OrderCreate {
                customer_id: CustomerId::new("alice@example.com"),
                prescription_id: None,
                origin: OrderOrigin::Prescription,
                items,
                shipping: Decimal::new(500, 0),
                tax_rate: Decimal::ZERO,
                payment_method: PaymentMethod::Card,
            },
        )
    }

    fn assert_totals(order: &Order) {
        assert!(money_eq(order.total, order.subtotal + order.shipping + order.tax));
    }

    #[test]
    fn creation_is_all_or_nothing() {
        let err = draft(vec![line(100, 3, 5), line(10, 6, 5)]).unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { requested: 6, available: 5, .. }));
        assert!(draft(vec![]).is_err());

        let order = draft(vec![line(100, 3, 5)]).unwrap();
        assert_eq!(order.subtotal, Decimal::new(300, 0));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.customization_confirmed);
        assert_totals(&order);
    }

    #[test]
    fn increase_stops_at_the_stock_snapshot() {
        let item = line(100, 4, 5);
        let pid = item.product_id;
        let mut order = draft(vec![item]).unwrap();

        order.handle_action(OrderAction::IncreaseQuantity(pid)).unwrap();
        order.handle_action(OrderAction::IncreaseQuantity(pid)).unwrap();
        assert_eq!(order.item(&pid).unwrap().quantity, 5);
        assert!(!order.item(&pid).unwrap().can_increase());
        assert_eq!(order.subtotal, Decimal::new(500, 0));
        assert_totals(&order);
    }

    #[test]
    fn decrease_to_zero_removes_the_line() {
        let item = line(100, 1, 5);
        let pid = item.product_id;
        let mut order = draft(vec![item]).unwrap();

        order.handle_action(OrderAction::DecreaseQuantity(pid)).unwrap();
        assert!(order.items.is_empty());
        assert_eq!(order.subtotal, Decimal::ZERO);
        assert_eq!(order.total, Decimal::new(500, 0));

        let err = order.handle_action(OrderAction::RemoveItem(pid)).unwrap_err();
        assert!(matches!(err, OrderError::ItemNotFound(_)));
    }

    #[test]
    fn tax_follows_the_rate() {
        let mut order = draft(vec![line(100, 3, 5)]).unwrap();
        order.tax_rate = Decimal::new(5, 2);
        order.recompute_totals();
        assert_eq!(order.tax, Decimal::new(1500, 2));
        assert_eq!(order.total, Decimal::new(81500, 2));
    }

    #[test]
    fn confirmation_locks_items_and_is_idempotent() {
        let item = line(100, 3, 5);
        let pid = item.product_id;
        let mut order = draft(vec![item]).unwrap();
        let payment_id = PaymentId::new();

        order.handle_action(OrderAction::Confirm { payment_id }).unwrap();
        assert!(order.customization_confirmed);
        assert_eq!(order.status, OrderStatus::Confirmed);

        order.handle_action(OrderAction::Confirm { payment_id }).unwrap();
        let err = order.handle_action(OrderAction::Confirm { payment_id: PaymentId::new() }).unwrap_err();
        assert!(matches!(err, OrderError::Locked(_)));

        let err = order.handle_action(OrderAction::IncreaseQuantity(pid)).unwrap_err();
        assert!(matches!(err, OrderError::Locked(_)));
        assert!(order.on_delete().is_err());
        assert!(order.customization_confirmed);
    }

    #[test]
    fn held_orders_refuse_edits_until_released_or_confirmed() {
        let item = line(100, 2, 5);
        let pid = item.product_id;
        let mut order = draft(vec![item]).unwrap();
        let key = IdempotencyKey::new("attempt-1");

        order.handle_action(OrderAction::HoldForPayment { key: key.clone() }).unwrap();
        order.handle_action(OrderAction::HoldForPayment { key: key.clone() }).unwrap();
        let err = order.handle_action(OrderAction::HoldForPayment { key: IdempotencyKey::new("attempt-2") }).unwrap_err();
        assert!(matches!(err, OrderError::Locked(_)));
        assert!(matches!(order.handle_action(OrderAction::IncreaseQuantity(pid)), Err(OrderError::Locked(_))));
        assert!(matches!(order.handle_action(OrderAction::ReplaceItems(vec![])), Err(OrderError::Locked(_))));
        assert!(matches!(order.on_delete(), Err(OrderError::Locked(_))));

        // A foreign key cannot lift the hold.
        order.handle_action(OrderAction::ReleaseHold { key: IdempotencyKey::new("attempt-2") }).unwrap();
        assert!(order.payment_hold.is_some());

        order.handle_action(OrderAction::ReleaseHold { key }).unwrap();
        order.handle_action(OrderAction::IncreaseQuantity(pid)).unwrap();
        assert_eq!(order.item(&pid).map(|i| i.quantity), Some(3));

        order.handle_action(OrderAction::HoldForPayment { key: IdempotencyKey::new("attempt-3") }).unwrap();
        order.handle_action(OrderAction::Confirm { payment_id: PaymentId::new() }).unwrap();
        assert!(order.payment_hold.is_none());
        assert!(matches!(order.on_delete(), Err(OrderError::Locked(_))));
    }

    #[test]
    fn status_transitions_follow_fulfillment_order() {
        let mut order = draft(vec![line(100, 1, 5)]).unwrap();
        let err = order.handle_action(OrderAction::TransitionStatus(OrderStatus::Shipped)).unwrap_err();
        assert_eq!(err, OrderError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Shipped });

        order.handle_action(OrderAction::Confirm { payment_id: PaymentId::new() }).unwrap();
        order.handle_action(OrderAction::TransitionStatus(OrderStatus::Shipped)).unwrap();
        order.handle_action(OrderAction::TransitionStatus(OrderStatus::Delivered)).unwrap();
        assert!(order.handle_action(OrderAction::TransitionStatus(OrderStatus::Cancelled)).is_err());
        order.handle_action(OrderAction::TransitionStatus(OrderStatus::Completed)).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn replace_items_validates_bounds() {
        let mut order = draft(vec![line(100, 1, 5)]).unwrap();
        assert!(order.handle_action(OrderAction::ReplaceItems(vec![line(10, 9, 2)])).is_err());
        order.handle_action(OrderAction::ReplaceItems(vec![line(10, 2, 2), line(5, 1, 1)])).unwrap();
        assert_eq!(order.subtotal, Decimal::new(25, 0));
        assert_totals(&order);
    }
}
