use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::LocalCartStore;
use crate::app_system::CartMergePolicy;
use crate::cart_service::CartError;
use crate::clients::{AssemblyClient, CartClient, ProductClient};
use crate::domain::{
    quantity_in_cart, CartItem, CustomerId, OrderId, PaymentMethod, Principal, Product, ProductId, Selection,
};
use crate::order_actor::OrderError;

fn from_order_error(e: OrderError) -> CartError {
    match e {
        OrderError::InsufficientStock { product, requested, available } => {
            CartError::InsufficientStock { product, requested, available }
        }
        OrderError::InvalidProduct(id) => CartError::UnknownProduct(id),
        OrderError::ValidationError(msg) => CartError::ValidationError(msg),
        OrderError::Unauthorized(msg) => CartError::Unauthorized(msg),
        other => CartError::ActorCommunicationError(other.to_string()),
    }
}

/// Cart reconciler for one visitor.
///
/// Mutations apply to the in-memory cart first and are then persisted:
/// to the server cart for customers, to the local store for guests. A
/// failed sync is logged and never rolls back the local change.
pub struct CartSession {
    principal: Principal,
    items: Vec<CartItem>,
    catalog: HashMap<ProductId, Product>,
    products: ProductClient,
    carts: CartClient,
    assembly: AssemblyClient,
    local: Arc<dyn LocalCartStore>,
    merge_policy: CartMergePolicy,
}

impl CartSession {
    /// Loads the catalog snapshot and the visitor's cart.
    #[instrument(skip_all, fields(role = principal.role()))]
    pub async fn start(
        principal: Principal,
        products: ProductClient,
        carts: CartClient,
        assembly: AssemblyClient,
        local: Arc<dyn LocalCartStore>,
        merge_policy: CartMergePolicy,
    ) -> Result<Self, CartError> {
        let mut session = Self {
            principal,
            items: Vec::new(),
            catalog: HashMap::new(),
            products,
            carts,
            assembly,
            local,
            merge_policy,
        };
        session.refresh_catalog().await?;

        session.items = match session.principal.customer_id() {
            Some(customer) => session.carts.load_cart(customer.clone()).await?,
            None => {
                let stored = session.local.load().unwrap_or_else(|e| {
                    warn!(error = %e, "Discarding unreadable guest cart");
                    Vec::new()
                });
                session.sanitize(stored)
            }
        };
        info!(lines = session.items.len(), "Cart session started");
        Ok(session)
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        quantity_in_cart(&self.items, &product_id)
    }

    /// Reloads the stock snapshot the cart is checked against.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&mut self) -> Result<(), CartError> {
        let products = self
            .products
            .list_products()
            .await
            .map_err(|e| CartError::ActorCommunicationError(e.to_string()))?;
        self.catalog = products.into_iter().map(|p| (p.id, p)).collect();
        debug!(products = self.catalog.len(), "Catalog snapshot loaded");
        Ok(())
    }

    /// Snapshot stock minus what this cart already holds.
    ///
    /// `None` for unknown products and for prescription-gated products,
    /// which are never sold through the cart.
    pub fn available_stock(&self, product_id: ProductId) -> Option<u32> {
        let product = self.catalog.get(&product_id)?;
        if product.prescription_required {
            return None;
        }
        Some(product.stock.saturating_sub(self.quantity_of(product_id)))
    }

    fn product(&self, product_id: ProductId) -> Result<&Product, CartError> {
        let product = self
            .catalog
            .get(&product_id)
            .ok_or_else(|| CartError::UnknownProduct(product_id.to_string()))?;
        if product.prescription_required {
            return Err(CartError::PrescriptionRequired(product.name.clone()));
        }
        Ok(product)
    }

    #[instrument(skip(self), fields(role = self.principal.role()))]
    pub async fn add_item(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ValidationError("quantity must be at least 1".to_string()));
        }
        let product = self.product(product_id)?;
        let available = product.stock.saturating_sub(self.quantity_of(product_id));
        if quantity > available {
            return Err(CartError::InsufficientStock {
                product: product.name.clone(),
                requested: quantity,
                available,
            });
        }

        match self.items.iter_mut().find(|item| item.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem::new(product_id, quantity)),
        }
        self.persist().await;
        Ok(())
    }

    /// Sets a line's quantity; zero removes it.
    #[instrument(skip(self), fields(role = self.principal.role()))]
    pub async fn update_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(product_id).await;
        }
        let product = self.product(product_id)?;
        if quantity > product.stock {
            return Err(CartError::InsufficientStock {
                product: product.name.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or_else(|| CartError::ValidationError(format!("product {} is not in the cart", product_id)))?;
        item.quantity = quantity;
        self.persist().await;
        Ok(())
    }

    #[instrument(skip(self), fields(role = self.principal.role()))]
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        self.items.retain(|item| item.product_id != product_id);
        self.persist().await;
        Ok(())
    }

    async fn persist(&self) {
        match self.principal.customer_id() {
            Some(customer) => {
                if let Err(e) = self.carts.save_cart(customer.clone(), self.items.clone()).await {
                    warn!(error = %e, "Cart sync failed, keeping local change");
                }
            }
            None => {
                if let Err(e) = self.local.save(&self.items) {
                    warn!(error = %e, "Guest cart could not be stored");
                }
            }
        }
    }

    /// Switches the session to `customer`, reconciling the guest cart with
    /// the customer's persisted cart according to the merge policy.
    #[instrument(skip(self), fields(policy = ?self.merge_policy, guest_lines = self.items.len()))]
    pub async fn merge_on_login(&mut self, customer: CustomerId) -> Result<(), CartError> {
        let server = self.carts.load_cart(customer.clone()).await?;
        let guest = std::mem::take(&mut self.items);
        self.principal = Principal::Customer(customer);

        self.items = match self.merge_policy {
            CartMergePolicy::ServerAuthoritative => server,
            CartMergePolicy::Combine => self.sanitize(server.into_iter().chain(guest).collect()),
        };

        if let Err(e) = self.local.clear() {
            warn!(error = %e, "Guest cart could not be cleared");
        }
        self.persist().await;
        info!(lines = self.items.len(), "Cart merged on login");
        Ok(())
    }

    /// Folds duplicate lines together and caps each at the snapshot stock.
    ///
    /// Guest carts come from storage the visitor controls, so lines for
    /// unknown or prescription-gated products and empty lines are dropped.
    fn sanitize(&self, items: Vec<CartItem>) -> Vec<CartItem> {
        let mut clean: Vec<CartItem> = Vec::with_capacity(items.len());
        for incoming in items {
            let Some(product) = self.catalog.get(&incoming.product_id) else {
                debug!(product_id = %incoming.product_id, "Dropping unknown product from cart");
                continue;
            };
            if product.prescription_required {
                debug!(product_id = %incoming.product_id, "Dropping prescription product from cart");
                continue;
            }
            match clean.iter_mut().find(|item| item.product_id == incoming.product_id) {
                Some(item) => item.quantity = item.quantity.saturating_add(incoming.quantity),
                None => clean.push(incoming),
            }
        }
        for item in clean.iter_mut() {
            if let Some(product) = self.catalog.get(&item.product_id) {
                item.quantity = item.quantity.min(product.stock);
            }
        }
        clean.retain(|item| item.quantity > 0);
        clean
    }

    /// Turns the cart into a direct online order and empties the cart.
    #[instrument(skip(self), fields(role = self.principal.role(), lines = self.items.len()))]
    pub async fn checkout(&mut self, payment_method: PaymentMethod) -> Result<OrderId, CartError> {
        if self.items.is_empty() {
            return Err(CartError::ValidationError("cart is empty".to_string()));
        }
        let customer = self
            .principal
            .customer_id()
            .cloned()
            .ok_or_else(|| CartError::Unauthorized("sign in to check out".to_string()))?;

        let selections: Vec<Selection> = self.items.iter().map(Selection::from).collect();
        let order_id = self
            .assembly
            .create_online_order(&self.principal, &selections, payment_method)
            .await
            .map_err(from_order_error)?;

        self.items.clear();
        if let Err(e) = self.carts.clear_cart(customer).await {
            warn!(error = %e, "Server cart could not be cleared after checkout");
        }
        info!(order_id = %order_id, "Cart checked out");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_system::{Config, PharmacySystem};
    use crate::domain::ProductCreate;
    use crate::session::MemoryCartStore;
    use rust_decimal::Decimal;

    struct Fixture {
        system: PharmacySystem,
        aspirin: ProductId,
        insulin: ProductId,
    }

    async fn fixture(policy: CartMergePolicy) -> Fixture {
        let config = Config { cart_merge_policy: policy, ..Config::default() };
        let system = PharmacySystem::new(&config);
        let aspirin = system
            .product_client
            .create_product(ProductCreate::new("Aspirin", Decimal::new(250, 2), 4))
            .await
            .unwrap();
        let insulin = system
            .product_client
            .create_product(ProductCreate::new("Insulin", Decimal::new(4000, 2), 10).prescription_only())
            .await
            .unwrap();
        Fixture { system, aspirin, insulin }
    }

    fn alice() -> CustomerId {
        CustomerId::new("alice@example.com")
    }

    #[tokio::test]
    async fn available_stock_subtracts_own_cart() {
        let f = fixture(CartMergePolicy::Combine).await;
        let mut session = f.system.cart_session(Principal::Guest, Arc::new(MemoryCartStore::new())).await.unwrap();

        assert_eq!(session.available_stock(f.aspirin), Some(4));
        session.add_item(f.aspirin, 3).await.unwrap();
        assert_eq!(session.available_stock(f.aspirin), Some(1));
        assert_eq!(session.available_stock(f.insulin), None);

        let err = session.add_item(f.aspirin, 2).await.unwrap_err();
        assert_eq!(err, CartError::InsufficientStock { product: "Aspirin".into(), requested: 2, available: 1 });
        assert_eq!(session.quantity_of(f.aspirin), 3);
    }

    #[tokio::test]
    async fn prescription_products_are_refused() {
        let f = fixture(CartMergePolicy::Combine).await;
        let mut session = f.system.cart_session(Principal::Guest, Arc::new(MemoryCartStore::new())).await.unwrap();

        let err = session.add_item(f.insulin, 1).await.unwrap_err();
        assert_eq!(err, CartError::PrescriptionRequired("Insulin".into()));
        assert!(session.items().is_empty());
    }

    #[tokio::test]
    async fn zero_quantity_removes_the_line() {
        let f = fixture(CartMergePolicy::Combine).await;
        let store = Arc::new(MemoryCartStore::new());
        let mut session = f.system.cart_session(Principal::Guest, store.clone()).await.unwrap();

        session.add_item(f.aspirin, 2).await.unwrap();
        assert_eq!(store.load().unwrap().len(), 1);

        session.update_quantity(f.aspirin, 0).await.unwrap();
        assert!(session.items().is_empty());
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn guest_cart_survives_a_new_session() {
        let f = fixture(CartMergePolicy::Combine).await;
        let store = Arc::new(MemoryCartStore::new());
        let mut session = f.system.cart_session(Principal::Guest, store.clone()).await.unwrap();
        session.add_item(f.aspirin, 2).await.unwrap();

        let reopened = f.system.cart_session(Principal::Guest, store).await.unwrap();
        assert_eq!(reopened.quantity_of(f.aspirin), 2);
    }

    #[tokio::test]
    async fn combine_merge_sums_and_caps_at_stock() {
        let f = fixture(CartMergePolicy::Combine).await;
        f.system.cart_client.save_cart(alice(), vec![CartItem::new(f.aspirin, 3)]).await.unwrap();

        let store = Arc::new(MemoryCartStore::new());
        let mut session = f.system.cart_session(Principal::Guest, store.clone()).await.unwrap();
        session.add_item(f.aspirin, 2).await.unwrap();

        session.merge_on_login(alice()).await.unwrap();
        assert_eq!(session.principal(), &Principal::Customer(alice()));
        assert_eq!(session.quantity_of(f.aspirin), 4);
        assert!(store.load().unwrap().is_empty());
        assert_eq!(f.system.cart_client.load_cart(alice()).await.unwrap(), vec![CartItem::new(f.aspirin, 4)]);
    }

    #[tokio::test]
    async fn tampered_guest_entries_are_cleaned_on_load() {
        let f = fixture(CartMergePolicy::Combine).await;
        f.system.cart_client.save_cart(alice(), vec![CartItem::new(f.aspirin, 1)]).await.unwrap();

        let stale = ProductId::new();
        let raw = serde_json::to_string(&vec![
            CartItem::new(f.aspirin, u32::MAX),
            CartItem::new(f.aspirin, 3),
            CartItem::new(f.insulin, 2),
            CartItem::new(stale, 1),
        ])
        .unwrap();
        let store = Arc::new(MemoryCartStore::with_entry(raw));

        let mut session = f.system.cart_session(Principal::Guest, store).await.unwrap();
        assert_eq!(session.items(), &[CartItem::new(f.aspirin, 4)]);
        assert_eq!(session.available_stock(f.aspirin), Some(0));
        assert!(matches!(session.add_item(f.aspirin, 1).await, Err(CartError::InsufficientStock { .. })));

        session.merge_on_login(alice()).await.unwrap();
        assert_eq!(session.items(), &[CartItem::new(f.aspirin, 4)]);
    }

    #[tokio::test]
    async fn empty_guest_lines_are_dropped() {
        let f = fixture(CartMergePolicy::Combine).await;
        let raw = serde_json::to_string(&vec![CartItem::new(f.aspirin, 0)]).unwrap();
        let session = f.system.cart_session(Principal::Guest, Arc::new(MemoryCartStore::with_entry(raw))).await.unwrap();
        assert!(session.items().is_empty());
    }

    #[tokio::test]
    async fn server_policy_keeps_the_persisted_cart() {
        let f = fixture(CartMergePolicy::ServerAuthoritative).await;
        f.system.cart_client.save_cart(alice(), vec![CartItem::new(f.aspirin, 1)]).await.unwrap();

        let mut session = f.system.cart_session(Principal::Guest, Arc::new(MemoryCartStore::new())).await.unwrap();
        session.add_item(f.aspirin, 3).await.unwrap();

        session.merge_on_login(alice()).await.unwrap();
        assert_eq!(session.items(), &[CartItem::new(f.aspirin, 1)]);
    }

    #[tokio::test]
    async fn checkout_creates_an_online_order_and_empties_the_cart() {
        let f = fixture(CartMergePolicy::Combine).await;
        let customer = Principal::Customer(alice());
        let mut session = f.system.cart_session(customer.clone(), Arc::new(MemoryCartStore::new())).await.unwrap();

        assert!(matches!(session.checkout(PaymentMethod::Card).await, Err(CartError::ValidationError(_))));

        session.add_item(f.aspirin, 2).await.unwrap();
        let order_id = session.checkout(PaymentMethod::Card).await.unwrap();

        assert!(session.items().is_empty());
        assert!(f.system.cart_client.load_cart(alice()).await.unwrap().is_empty());
        let order = f.system.order_client.get_order(order_id).await.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.subtotal, Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn guests_cannot_check_out() {
        let f = fixture(CartMergePolicy::Combine).await;
        let mut session = f.system.cart_session(Principal::Guest, Arc::new(MemoryCartStore::new())).await.unwrap();
        session.add_item(f.aspirin, 1).await.unwrap();

        assert!(matches!(session.checkout(PaymentMethod::Card).await, Err(CartError::Unauthorized(_))));
        assert_eq!(session.quantity_of(f.aspirin), 1);
    }
}
