use tracing::{debug, error, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::domain::{
    CustomerId, IdempotencyKey, LineItem, Order, OrderId, OrderQuery, OrderStatus, Page, PaymentId, Principal,
    ProductId,
};
use crate::order_actor::{OrderAction, OrderError};
use crate::clients::ProductClient;

/// Client for interacting with the Order actor.
///
/// Covers the customer's customization of a draft order, the administrator's
/// fulfillment transitions and listing, and the confirmation step used by
/// checkout.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    product_client: ProductClient,
    page_size: usize,
}

crate::impl_client_methods!(OrderClient, Order, OrderId, OrderError, order);

fn require_customer(principal: &Principal) -> Result<&CustomerId, OrderError> {
    principal
        .customer_id()
        .ok_or_else(|| OrderError::Unauthorized(format!("{} cannot edit customer orders", principal.role())))
}

fn require_admin(principal: &Principal) -> Result<(), OrderError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(OrderError::Unauthorized(format!("{} cannot manage fulfillment", principal.role())))
    }
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>, product_client: ProductClient, page_size: usize) -> Self {
        Self {
            inner,
            product_client,
            page_size: page_size.max(1),
        }
    }

    /// Fetches an order and checks that `principal` owns it.
    async fn owned_order(&self, principal: &Principal, id: OrderId) -> Result<Order, OrderError> {
        let customer = require_customer(principal)?;
        let order = self.get_order(id).await?;
        if !order.belongs_to(customer) {
            warn!(order_id = %id, "Order belongs to another customer");
            return Err(OrderError::Unauthorized(format!("order {} belongs to another customer", id)));
        }
        Ok(order)
    }

    async fn customize(&self, principal: &Principal, id: OrderId, action: OrderAction) -> Result<Order, OrderError> {
        self.owned_order(principal, id).await?;
        let order = self.inner.perform_action(id, action, None).await?;
        debug!(order_id = %id, subtotal = %order.subtotal, total = %order.total, "Order customized");
        Ok(order)
    }

    /// Adds one unit. When the stock snapshot is reached the order comes back unchanged.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn increase_quantity(
        &self,
        principal: &Principal,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Order, OrderError> {
        self.customize(principal, order_id, OrderAction::IncreaseQuantity(product_id)).await
    }

    /// Removes one unit; the line is removed when it reaches zero.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn decrease_quantity(
        &self,
        principal: &Principal,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Order, OrderError> {
        self.customize(principal, order_id, OrderAction::DecreaseQuantity(product_id)).await
    }

    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn remove_item(
        &self,
        principal: &Principal,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Order, OrderError> {
        self.customize(principal, order_id, OrderAction::RemoveItem(product_id)).await
    }

    /// Replaces the whole line-item list (the patch-items operation).
    #[instrument(skip(self, items), fields(role = principal.role(), lines = items.len()))]
    pub async fn replace_items(
        &self,
        principal: &Principal,
        order_id: OrderId,
        items: Vec<LineItem>,
    ) -> Result<Order, OrderError> {
        self.customize(principal, order_id, OrderAction::ReplaceItems(items)).await
    }

    /// Deletes a draft order. Orders being paid for or already confirmed are refused;
    /// only an administrator can cancel those.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn cancel_order(&self, principal: &Principal, order_id: OrderId) -> Result<(), OrderError> {
        self.owned_order(principal, order_id).await?;
        self.inner.delete(order_id).await?;
        info!(order_id = %order_id, "Draft order cancelled");
        Ok(())
    }

    /// Freezes the order for a checkout attempt, provided nothing changed since `expected_version`.
    #[instrument(skip(self))]
    pub async fn hold_for_payment(
        &self,
        order_id: OrderId,
        key: IdempotencyKey,
        expected_version: u64,
    ) -> Result<Order, OrderError> {
        let order = self
            .inner
            .perform_action(order_id, OrderAction::HoldForPayment { key }, Some(expected_version))
            .await?;
        debug!(order_id = %order_id, total = %order.total, "Order held for payment");
        Ok(order)
    }

    /// Makes the order editable again after a failed charge.
    #[instrument(skip(self))]
    pub async fn release_hold(&self, order_id: OrderId, key: IdempotencyKey) -> Result<Order, OrderError> {
        self.inner.perform_action(order_id, OrderAction::ReleaseHold { key }, None).await
    }

    /// Locks the order and records the payment behind it. Safe to repeat with the same payment.
    #[instrument(skip(self))]
    pub async fn confirm(&self, order_id: OrderId, payment_id: PaymentId) -> Result<Order, OrderError> {
        let order = self.inner.perform_action(order_id, OrderAction::Confirm { payment_id }, None).await?;
        info!(order_id = %order_id, "Order confirmed");
        Ok(order)
    }

    /// Administrator fulfillment transitions. Cancelling returns the items to stock.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn transition_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        require_admin(principal)?;
        let order = self
            .inner
            .perform_action(order_id, OrderAction::TransitionStatus(next), None)
            .await
            .inspect_err(|e| error!(error = %e, "Status transition refused"))?;

        if next == OrderStatus::Cancelled {
            let lines: Vec<(ProductId, u32)> = order.items.iter().map(|i| (i.product_id, i.quantity)).collect();
            self.product_client.release_all(&lines).await;
        }
        info!(order_id = %order_id, status = %order.status, "Order status changed");
        Ok(order)
    }

    /// The caller's own orders, newest first.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn list_for_customer(&self, principal: &Principal) -> Result<Vec<Order>, OrderError> {
        let customer = require_customer(principal)?.clone();
        let mut orders = self.inner.list(Some(Box::new(move |o: &Order| o.customer_id == customer))).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Admin operational view. Only confirmed, shipped and delivered orders are ever returned.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn list_for_admin(&self, principal: &Principal, query: OrderQuery) -> Result<Page<Order>, OrderError> {
        require_admin(principal)?;
        let status = query.status;
        let search = query.search.unwrap_or_default();
        let mut orders = self
            .inner
            .list(Some(Box::new(move |o: &Order| {
                o.status.is_admin_visible() && status.map_or(true, |s| o.status == s) && o.matches_search(&search)
            })))
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = query.page.max(1);
        let total = orders.len();
        let items = orders.into_iter().skip((page - 1) * self.page_size).take(self.page_size).collect();
        Ok(Page { items, page, per_page: self.page_size, total })
    }
}
