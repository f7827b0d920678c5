use tracing::{debug, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::domain::{Product, ProductCreate, ProductId, ProductPatch};
use crate::product_actor::{ProductAction, ProductActionResult, ProductError};

/// Client for interacting with the Product actor (the inventory snapshot provider).
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

crate::impl_basic_client!(ProductClient, Product, ProductId, ProductError, product);

fn unexpected(result: ProductActionResult) -> ProductError {
    ProductError::ActorCommunicationError(format!("Unexpected result: {:?}", result))
}

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<ProductId, ProductError> {
        debug!("Sending request");
        self.inner.create(params).await
    }

    #[instrument(skip(self))]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product, ProductError> {
        debug!("Sending request");
        self.inner.update(id, patch, None).await
    }

    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: ProductId) -> Result<u32, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::CheckStock, None).await? {
            ProductActionResult::StockLevel(level) => Ok(level),
            other => Err(unexpected(other)),
        }
    }

    /// Conditionally decrements stock; the authoritative decrement point of the workflow.
    #[instrument(skip(self))]
    pub async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<u32, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::ReserveStock(quantity), None).await? {
            ProductActionResult::Reserved { remaining } => {
                info!(remaining, "Stock reserved");
                Ok(remaining)
            }
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<u32, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::ReleaseStock(quantity), None).await? {
            ProductActionResult::Released { stock } => {
                info!(stock, "Stock released");
                Ok(stock)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Reserves every `(product, quantity)` pair or none of them.
    ///
    /// On the first failure, the reservations already made are released and
    /// that failure is returned.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reserve_all(&self, lines: &[(ProductId, u32)]) -> Result<(), ProductError> {
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        for &(id, quantity) in lines {
            if let Err(e) = self.reserve_stock(id, quantity).await {
                warn!(product_id = %id, error = %e, "Reservation failed, rolling back");
                self.release_all(&reserved).await;
                return Err(e);
            }
            reserved.push((id, quantity));
        }
        Ok(())
    }

    /// Best-effort compensation; failures are logged.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn release_all(&self, lines: &[(ProductId, u32)]) {
        for &(id, quantity) in lines {
            if let Err(e) = self.release_stock(id, quantity).await {
                warn!(product_id = %id, quantity, error = %e, "Failed to release stock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;
    use rust_decimal::Decimal;

    fn start() -> ProductClient {
        let (actor, inner) = ResourceActor::<Product>::new(10, ProductId::new);
        tokio::spawn(actor.run());
        ProductClient::new(inner)
    }

    #[tokio::test]
    async fn reserve_all_rolls_back_on_shortage() {
        let client = start();
        let a = client.create_product(ProductCreate::new("A", Decimal::ONE, 5)).await.unwrap();
        let b = client.create_product(ProductCreate::new("B", Decimal::ONE, 1)).await.unwrap();

        let err = client.reserve_all(&[(a, 3), (b, 2)]).await.unwrap_err();
        assert_eq!(err, ProductError::InsufficientStock { requested: 2, available: 1 });
        assert_eq!(client.check_stock(a).await.unwrap(), 5);
        assert_eq!(client.check_stock(b).await.unwrap(), 1);

        client.reserve_all(&[(a, 3), (b, 1)]).await.unwrap();
        assert_eq!(client.get_product(a).await.unwrap().stock, 2);
        assert_eq!(client.get_product(b).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn unknown_products_are_not_found() {
        let client = start();
        let missing = ProductId::new();
        assert_eq!(client.get_product(missing).await.unwrap_err(), ProductError::NotFound(missing.to_string()));
        assert!(client.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restocking_changes_what_can_be_reserved() {
        let client = start();
        let id = client.create_product(ProductCreate::new("Gauze", Decimal::new(4, 0), 1)).await.unwrap();

        let patch = ProductPatch { stock: Some(6), ..ProductPatch::default() };
        let product = client.update_product(id, patch).await.unwrap();
        assert_eq!(product.stock, 6);
        assert_eq!(client.reserve_stock(id, 4).await.unwrap(), 2);

        let bad = ProductPatch { price: Some(Decimal::NEGATIVE_ONE), ..ProductPatch::default() };
        assert!(matches!(client.update_product(id, bad).await, Err(ProductError::ValidationError(_))));
    }
}
