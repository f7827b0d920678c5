use tokio::sync::mpsc;

use crate::cart_service::{CartError, CartRequest};
use crate::domain::{CartItem, CustomerId};

/// Client for the server-side cart store.
#[derive(Clone)]
pub struct CartClient {
    sender: mpsc::Sender<CartRequest>,
}

impl CartClient {
    pub fn new(sender: mpsc::Sender<CartRequest>) -> Self {
        Self { sender }
    }
}

crate::client_method!(CartClient => fn load_cart(customer_id: CustomerId) -> Vec<CartItem> as CartRequest::LoadCart, Error = CartError);
crate::client_method!(CartClient => fn save_cart(customer_id: CustomerId, items: Vec<CartItem>) -> () as CartRequest::SaveCart, Error = CartError);
crate::client_method!(CartClient => fn clear_cart(customer_id: CustomerId) -> () as CartRequest::ClearCart, Error = CartError);
