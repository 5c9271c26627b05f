pub mod client;
pub mod session;
pub mod transport;

pub use crate::domain::cart::Cart;
pub use crate::domain::model::{ActiveProductCatalog, SaleResult, UserProfile};
pub use crate::domain::ports::{ConfigProvider, StregsystemApi};
pub use crate::utils::error::Result;
