pub mod cart;
pub mod ids;
pub mod money;
pub mod order;
pub mod payment;
pub mod prescription;
pub mod principal;
pub mod product;
pub mod reminder;

pub use cart::*;
pub use ids::*;
pub use order::*;
pub use payment::*;
pub use prescription::*;
pub use principal::*;
pub use product::*;
pub use reminder::*;
