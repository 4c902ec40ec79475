//! Data models for the inventory backend.
//!
//! - `Product`, `ProductPage`, `ProductWarehouseStock`: catalog items and
//!   their per-warehouse quantities
//! - `Category`, `Warehouse`: catalog setup
//! - `User`, `UserProfile`: accounts and the signed-in user's stored profile
//! - `StockOutDraft`, `StockOutRequest`: stock leaving warehouses
//! - `ReportKind`, `ReportRows`, `DashboardStats`: tabular reports
//!
//! The backend is loose about numeric types (sums and decimals sometimes
//! arrive as strings), so amounts and quantities are parsed leniently.

pub mod catalog;
pub mod product;
pub mod report;
pub mod stock;
pub mod user;
pub mod validation;

pub use catalog::{Category, CategoryInput, CategoryPage, Pagination, Warehouse, WarehouseInput, WarehouseList};
pub use product::{
    NewProduct, Product, ProductDetail, ProductPage, ProductWarehouseStock, ProductWarehouses,
    WarehouseQuantity,
};
pub use report::{
    DashboardStats, LowStockItem, OutOfStockItem, ReportColumn, ReportKind, ReportRows,
    WarehouseStockRow,
};
pub use stock::{StockOutDraft, StockOutLine, StockOutRequest, StockOutRow};
pub use user::{LoginRequest, LoginResponse, NewUser, PageMeta, Registration, User, UserPage, UserProfile, UserUpdate};
pub use validation::FormError;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept a number or a numeric string; anything else becomes `None`.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    })
}

/// Accept a number or a string and keep it as display text.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}
