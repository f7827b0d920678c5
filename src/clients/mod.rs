//! Typed clients. Orchestration across actors happens here, on the caller's side.

mod macros;

pub mod assembly_client;
pub mod cart_client;
pub mod checkout_client;
pub mod order_client;
pub mod payment_client;
pub mod prescription_client;
pub mod product_client;
pub mod reminder_client;

pub use assembly_client::*;
pub use cart_client::*;
pub use checkout_client::*;
pub use order_client::*;
pub use payment_client::*;
pub use prescription_client::*;
pub use product_client::*;
pub use reminder_client::*;
