pub mod auth;
pub mod config;
pub use config::{AppConfigImpl, DatabaseConfig, ServerConfig};
pub mod database;
pub mod normalize;
pub mod repository;
