//! Server-side persisted carts for authenticated customers.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::clients::CartClient;
use crate::domain::{CartItem, CustomerId};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart validation error: {0}")]
    ValidationError(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Unknown product: {0}")]
    UnknownProduct(String),
    #[error("{0} requires a prescription")]
    PrescriptionRequired(String),
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock { product: String, requested: u32, available: u32 },
    #[error("Cart storage error: {0}")]
    Storage(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

pub type ServiceResponse<T> = oneshot::Sender<Result<T, CartError>>;

#[derive(Debug)]
pub enum CartRequest {
    LoadCart {
        customer_id: CustomerId,
        respond_to: ServiceResponse<Vec<CartItem>>,
    },
    SaveCart {
        customer_id: CustomerId,
        items: Vec<CartItem>,
        respond_to: ServiceResponse<()>,
    },
    ClearCart {
        customer_id: CustomerId,
        respond_to: ServiceResponse<()>,
    },
}

pub struct CartService {
    receiver: mpsc::Receiver<CartRequest>,
    carts: HashMap<CustomerId, Vec<CartItem>>,
}

impl CartService {
    pub fn new(buffer_size: usize) -> (Self, CartClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self { receiver, carts: HashMap::new() };
        (service, CartClient::new(sender))
    }

    #[instrument(name = "cart_service", skip(self))]
    pub async fn run(mut self) {
        info!("CartService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CartRequest::LoadCart { customer_id, respond_to } => {
                    debug!(customer = %customer_id, "Loading cart");
                    let items = self.carts.get(&customer_id).cloned().unwrap_or_default();
                    let _ = respond_to.send(Ok(items));
                }
                CartRequest::SaveCart { customer_id, items, respond_to } => {
                    let _ = respond_to.send(self.handle_save_cart(customer_id, items));
                }
                CartRequest::ClearCart { customer_id, respond_to } => {
                    debug!(customer = %customer_id, "Clearing cart");
                    self.carts.remove(&customer_id);
                    let _ = respond_to.send(Ok(()));
                }
            }
        }
        info!("CartService stopped");
    }

    #[instrument(fields(customer = %customer_id, lines = items.len()), skip(self, customer_id, items))]
    fn handle_save_cart(&mut self, customer_id: CustomerId, items: Vec<CartItem>) -> Result<(), CartError> {
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(CartError::ValidationError(format!("quantity for {} must be at least 1", item.product_id)));
        }
        if items.is_empty() {
            self.carts.remove(&customer_id);
        } else {
            self.carts.insert(customer_id, items);
        }
        debug!("Cart saved");
        Ok(())
    }
}
