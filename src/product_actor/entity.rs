use rust_decimal::Decimal;

use crate::actor_framework::Entity;
use crate::domain::{Product, ProductCreate, ProductId, ProductPatch};
use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;

impl Entity for Product {
    type Id = ProductId;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Error = ProductError;

    fn id(&self) -> &ProductId { &self.id }
    fn version(&self) -> u64 { self.version }
    fn set_version(&mut self, version: u64) { self.version = version; }

    /// Creates a new Product from creation parameters.
    ///
    /// # Errors
    /// Rejects blank names and negative prices.
    fn from_create_params(id: ProductId, params: ProductCreate) -> Result<Self, ProductError> {
        if params.name.trim().is_empty() {
            return Err(ProductError::ValidationError("name is required".to_string()));
        }
        if params.price < Decimal::ZERO {
            return Err(ProductError::ValidationError(format!("price must be non-negative, got {}", params.price)));
        }
        Ok(Self {
            id,
            name: params.name,
            price: params.price,
            stock: params.stock,
            prescription_required: params.prescription_required,
            version: 0,
        })
    }

    /// Updates the product's price and/or stock.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        if let Some(price) = patch.price {
            if price < Decimal::ZERO {
                return Err(ProductError::ValidationError(format!("price must be non-negative, got {}", price)));
            }
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        Ok(())
    }

    /// Handles product-specific actions.
    ///
    /// # Actions
    /// - `CheckStock`: Returns the current stock level
    /// - `ReserveStock(amount)`: Decrements stock by the specified amount
    /// - `ReleaseStock(amount)`: Adds the amount back
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, ProductError> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::StockLevel(self.stock)),
            ProductAction::ReserveStock(0) | ProductAction::ReleaseStock(0) => {
                Err(ProductError::InvalidQuantity(0))
            }
            ProductAction::ReserveStock(amount) => {
                if self.stock >= amount {
                    self.stock -= amount;
                    Ok(ProductActionResult::Reserved { remaining: self.stock })
                } else {
                    Err(ProductError::InsufficientStock { requested: amount, available: self.stock })
                }
            }
            ProductAction::ReleaseStock(amount) => {
                self.stock = self.stock.saturating_add(amount);
                Ok(ProductActionResult::Released { stock: self.stock })
            }
        }
    }
}
