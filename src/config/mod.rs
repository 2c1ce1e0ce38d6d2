#[cfg(feature = "cli")]
pub mod cli;
pub mod store_config;

pub use store_config::StoreConfig;
