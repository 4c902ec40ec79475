//! Products and their stock spread across warehouses.

use serde::{Deserialize, Serialize};

use super::catalog::{Category, Pagination};
use super::validation::{required, FormError};
use super::{lenient_amount, lenient_i64};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cost: Option<String>,
    #[serde(default)]
    pub grn_date: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_stock: Option<i64>,
    #[serde(default)]
    pub stock_by_warehouse: Vec<WarehouseQuantity>,
}

impl Product {
    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("-")
    }

    /// Total stock, summing the per-warehouse figures when the backend
    /// did not send a total.
    pub fn stock(&self) -> i64 {
        self.total_stock
            .unwrap_or_else(|| self.stock_by_warehouse.iter().filter_map(|w| w.quantity).sum())
    }

    /// Label used in the stock-out product picker.
    pub fn picker_label(&self) -> String {
        match self.code.as_deref().filter(|c| !c.is_empty()) {
            Some(code) => format!("{} ({})", self.name, code),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseQuantity {
    pub warehouse: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
}

/// Available quantity of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWarehouseStock {
    pub warehouse_id: i64,
    pub warehouse_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub available_quantity: Option<i64>,
}

impl ProductWarehouseStock {
    pub fn available(&self) -> i64 {
        self.available_quantity.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductWarehouses {
    #[serde(default)]
    pub warehouses: Vec<ProductWarehouseStock>,
}

/// Body for adding a single product by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl NewProduct {
    pub fn new(name: &str) -> Result<Self, FormError> {
        Ok(Self {
            name: required("Name", name)?,
            code: None,
            brand: None,
            description: None,
            category_id: None,
            cost: None,
            grn_date: None,
            remarks: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "id": 7,
        "name": "Claw Hammer",
        "code": "HM-16",
        "brand": "Stanley",
        "category": {"id": 2, "name": "Tools"},
        "cost": "1450.00",
        "grn_date": "2024-03-01T00:00:00.000Z",
        "total_stock": "42",
        "stock_by_warehouse": [
            {"warehouse": "Main", "quantity": 30},
            {"warehouse": "Annex", "quantity": "12"}
        ]
    }"#;

    #[test]
    fn test_product_parse() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.id, 7);
        assert_eq!(product.category_name(), "Tools");
        assert_eq!(product.cost.as_deref(), Some("1450.00"));
        assert_eq!(product.stock(), 42);
        assert_eq!(product.stock_by_warehouse[1].quantity, Some(12));
        assert_eq!(product.picker_label(), "Claw Hammer (HM-16)");
    }

    #[test]
    fn test_stock_falls_back_to_warehouse_sum() {
        let product: Product = serde_json::from_str(
            r#"{"id":1,"name":"Tape","stock_by_warehouse":[{"warehouse":"A","quantity":4},{"warehouse":"B","quantity":5}]}"#,
        )
        .unwrap();
        assert_eq!(product.stock(), 9);
        assert_eq!(product.category_name(), "-");
        assert_eq!(product.picker_label(), "Tape");
    }

    #[test]
    fn test_warehouse_stock_available_never_negative() {
        let rows: ProductWarehouses = serde_json::from_str(
            r#"{"warehouses":[
                {"warehouse_id":1,"warehouse_name":"Main","available_quantity":"8"},
                {"warehouse_id":2,"warehouse_name":"Annex","available_quantity":-3},
                {"warehouse_id":3,"warehouse_name":"Yard"}
            ]}"#,
        )
        .unwrap();
        let available: Vec<i64> = rows.warehouses.iter().map(|w| w.available()).collect();
        assert_eq!(available, vec![8, 0, 0]);
    }

    #[test]
    fn test_new_product_omits_empty_fields() {
        let mut product = NewProduct::new("Drill").unwrap();
        product.category_id = Some(2);
        assert_eq!(
            serde_json::to_value(&product).unwrap(),
            serde_json::json!({"name": "Drill", "category_id": 2})
        );
        assert_eq!(NewProduct::new(" ").unwrap_err(), FormError::Required("Name"));
    }
}
