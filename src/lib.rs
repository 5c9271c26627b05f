pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::config::AppConfig;
pub use crate::core::{
    client::StregsystemClient,
    session::{SaleSession, SessionEvent, SessionState},
    transport::HttpTransport,
};
pub use crate::domain::cart::Cart;
pub use crate::domain::model::{ActiveProductCatalog, Product, SaleResponse, SaleResult, UserProfile};
pub use crate::domain::ports::{ConfigProvider, StregsystemApi};
pub use crate::utils::error::{Result, SaleError, StregError, TransportError};
