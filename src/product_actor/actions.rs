/// Custom actions for Product entities.
///
/// Stock is only ever changed through these, one request at a time inside the
/// product actor, which makes each check-and-decrement atomic.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Checks the current stock level without modifying it.
    CheckStock,
    /// Decrements stock by the given amount if at least that much is left.
    ///
    /// # Errors
    /// Fails with `InsufficientStock` and leaves stock untouched otherwise.
    ReserveStock(u32),
    /// Returns previously reserved units to stock.
    ReleaseStock(u32),
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq)]
pub enum ProductActionResult {
    StockLevel(u32),
    Reserved { remaining: u32 },
    Released { stock: u32 },
}
