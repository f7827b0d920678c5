use std::sync::Mutex;

use crate::cart_service::CartError;
use crate::domain::CartItem;

/// Client-local persistence for guest carts.
pub trait LocalCartStore: Send + Sync {
    fn load(&self) -> Result<Vec<CartItem>, CartError>;
    fn save(&self, items: &[CartItem]) -> Result<(), CartError>;
    fn clear(&self) -> Result<(), CartError>;
}

/// Keeps the cart as a serialized JSON entry, the way browser storage would.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    entry: Mutex<Option<String>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a raw entry.
    pub fn with_entry(raw: impl Into<String>) -> Self {
        Self { entry: Mutex::new(Some(raw.into())) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, CartError> {
        self.entry.lock().map_err(|_| CartError::Storage("cart store lock poisoned".to_string()))
    }
}

impl LocalCartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartItem>, CartError> {
        match self.lock()?.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|e| CartError::Storage(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, items: &[CartItem]) -> Result<(), CartError> {
        let raw = serde_json::to_string(items).map_err(|e| CartError::Storage(e.to_string()))?;
        *self.lock()? = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), CartError> {
        *self.lock()? = None;
        Ok(())
    }
}
