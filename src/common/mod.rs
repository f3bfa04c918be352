pub mod config;
pub mod errors;

pub use config::{Config, ConfigStore};
pub use errors::{Result, UpdropError};
