//! Content for each main tab.

pub mod dashboard;
pub mod inventory;
pub mod products;
pub mod reports;
pub mod stock;
pub mod users;
