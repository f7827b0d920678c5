//! Per-visitor cart context: one session object carrying the principal,
//! the cart, and the catalog snapshot the cart is reconciled against.

pub mod cart_session;
pub mod local_store;

pub use cart_session::*;
pub use local_store::*;
