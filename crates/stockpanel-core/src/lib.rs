//! Core library for StockPanel.
//!
//! Provides the pieces shared by every StockPanel front end:
//!
//! - `auth`: session storage, token expiry guard, and route guards
//! - `api`: REST client for the inventory backend
//! - `models`: products, catalog entities, users, stock movements, reports
//! - `config`: persisted application configuration
//! - `utils`: display formatting and pagination helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionGuard, SessionState, SharedStorage, StorageHandle};
pub use config::Config;
