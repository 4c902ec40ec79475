//! Stock-out drafting: pick a product, enter per-warehouse quantities,
//! validate, and build the request body.

use chrono::NaiveDate;
use serde::Serialize;

use super::product::ProductWarehouseStock;
use super::validation::FormError;
use crate::utils::format::sanitize_quantity;

/// Transaction date format sent to the backend.
pub const TRANSACTION_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockOutLine {
    #[serde(rename = "warehouseId")]
    pub warehouse_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockOutRequest {
    #[serde(rename = "productId")]
    pub product_id: i64,
    #[serde(rename = "transactionDate")]
    pub transaction_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub lines: Vec<StockOutLine>,
}

/// One warehouse row of the draft with the operator's typed quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutRow {
    pub warehouse: ProductWarehouseStock,
    pub quantity_out: String,
}

impl StockOutRow {
    /// Typed quantity; blank is zero. `None` when the digits do not fit.
    pub fn quantity(&self) -> Option<i64> {
        if self.quantity_out.is_empty() {
            return Some(0);
        }
        self.quantity_out.parse().ok()
    }

    pub fn exceeds_available(&self) -> bool {
        self.quantity()
            .map_or(true, |quantity| quantity > self.warehouse.available())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutDraft {
    pub product_id: Option<i64>,
    pub transaction_date: String,
    pub reference_no: String,
    pub remarks: String,
    pub rows: Vec<StockOutRow>,
}

impl StockOutDraft {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            product_id: None,
            transaction_date: today.format(TRANSACTION_DATE_FORMAT).to_string(),
            reference_no: String::new(),
            remarks: String::new(),
            rows: Vec::new(),
        }
    }

    /// Switch product. Rows belong to the previous product and are dropped
    /// until the warehouses for the new one arrive.
    pub fn select_product(&mut self, product_id: Option<i64>) {
        self.product_id = product_id;
        self.rows.clear();
    }

    /// Replace the warehouse rows, resetting every typed quantity.
    pub fn set_warehouses(&mut self, warehouses: Vec<ProductWarehouseStock>) {
        self.rows = warehouses
            .into_iter()
            .map(|warehouse| StockOutRow {
                warehouse,
                quantity_out: String::new(),
            })
            .collect();
    }

    /// Store the typed quantity for a warehouse, keeping only digits.
    pub fn set_quantity(&mut self, warehouse_id: i64, input: &str) {
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|r| r.warehouse.warehouse_id == warehouse_id)
        {
            row.quantity_out = sanitize_quantity(input);
        }
    }

    /// Sum of typed quantities, saturating rather than overflowing.
    pub fn total_quantity_out(&self) -> i64 {
        self.rows
            .iter()
            .map(|row| row.quantity().unwrap_or(i64::MAX))
            .fold(0i64, i64::saturating_add)
    }

    /// Validate and build the request. Rows with no quantity are left out.
    pub fn build_request(&self, today: NaiveDate) -> Result<StockOutRequest, FormError> {
        let product_id = self.product_id.ok_or(FormError::NoProductSelected)?;

        if let Some(row) = self.rows.iter().find(|r| r.quantity().is_none()) {
            return Err(FormError::InvalidQuantity(row.warehouse.warehouse_name.clone()));
        }
        let lines: Vec<(&StockOutRow, i64)> = self
            .rows
            .iter()
            .filter_map(|r| r.quantity().filter(|&q| q > 0).map(|q| (r, q)))
            .collect();
        if lines.is_empty() {
            return Err(FormError::NoQuantities);
        }
        if lines.iter().any(|(r, _)| r.exceeds_available()) {
            return Err(FormError::ExceedsAvailable);
        }

        let date = self.transaction_date.trim();
        let transaction_date = if date.is_empty() {
            today.format(TRANSACTION_DATE_FORMAT).to_string()
        } else {
            NaiveDate::parse_from_str(date, TRANSACTION_DATE_FORMAT)
                .map_err(|_| FormError::InvalidDate(date.to_string()))?
                .format(TRANSACTION_DATE_FORMAT)
                .to_string()
        };

        Ok(StockOutRequest {
            product_id,
            transaction_date,
            reference_no: non_empty(&self.reference_no),
            remarks: non_empty(&self.remarks),
            lines: lines
                .into_iter()
                .map(|(r, quantity)| StockOutLine {
                    warehouse_id: r.warehouse.warehouse_id,
                    quantity,
                })
                .collect(),
        })
    }

    /// After a recorded stock out the per-transaction fields are cleared.
    /// Quantities reset when the refreshed warehouses are set.
    pub fn clear_after_submit(&mut self) {
        self.reference_no.clear();
        self.remarks.clear();
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn warehouse(id: i64, available: i64) -> ProductWarehouseStock {
        ProductWarehouseStock {
            warehouse_id: id,
            warehouse_name: format!("W{id}"),
            location: None,
            available_quantity: Some(available),
        }
    }

    fn draft() -> StockOutDraft {
        let mut draft = StockOutDraft::new(today());
        draft.select_product(Some(9));
        draft.set_warehouses(vec![warehouse(1, 10), warehouse(2, 4)]);
        draft
    }

    #[test]
    fn test_new_draft_uses_today() {
        let draft = StockOutDraft::new(today());
        assert_eq!(draft.transaction_date, "2024-05-17");
        assert_eq!(draft.build_request(today()).unwrap_err(), FormError::NoProductSelected);
    }

    #[test]
    fn test_quantity_keeps_digits_only() {
        let mut draft = draft();
        draft.set_quantity(1, "1a2-");
        draft.set_quantity(2, "3");
        draft.set_quantity(99, "5");
        assert_eq!(draft.rows[0].quantity_out, "12");
        assert_eq!(draft.total_quantity_out(), 15);
    }

    #[test]
    fn test_requires_a_quantity() {
        let mut draft = draft();
        draft.set_quantity(1, "0");
        assert_eq!(draft.build_request(today()).unwrap_err(), FormError::NoQuantities);
    }

    #[test]
    fn test_rejects_more_than_available() {
        let mut draft = draft();
        draft.set_quantity(2, "5");
        assert_eq!(draft.build_request(today()).unwrap_err(), FormError::ExceedsAvailable);
        assert!(draft.rows[1].exceeds_available());
    }

    #[test]
    fn test_build_request_body() {
        let mut draft = draft();
        draft.set_quantity(2, "4");
        draft.reference_no = " INV-77 ".to_string();
        let req = draft.build_request(today()).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "productId": 9,
                "transactionDate": "2024-05-17",
                "reference_no": "INV-77",
                "lines": [{"warehouseId": 2, "quantity": 4}]
            })
        );
    }

    #[test]
    fn test_blank_date_defaults_and_bad_date_rejected() {
        let mut draft = draft();
        draft.set_quantity(1, "1");
        draft.transaction_date = String::new();
        assert_eq!(draft.build_request(today()).unwrap().transaction_date, "2024-05-17");

        draft.transaction_date = "17/05/2024".to_string();
        assert_eq!(
            draft.build_request(today()).unwrap_err(),
            FormError::InvalidDate("17/05/2024".to_string())
        );
    }

    #[test]
    fn test_oversized_quantity_is_rejected_not_dropped() {
        let mut draft = draft();
        draft.set_quantity(1, "9223372036854775807");
        draft.set_quantity(2, "99999999999999999999");
        assert_eq!(draft.total_quantity_out(), i64::MAX);
        assert_eq!(draft.rows[1].quantity(), None);
        assert!(draft.rows[1].exceeds_available());
        assert_eq!(
            draft.build_request(today()).unwrap_err(),
            FormError::InvalidQuantity("W2".to_string())
        );

        draft.set_quantity(2, "9223372036854775807");
        assert_eq!(draft.total_quantity_out(), i64::MAX);
        assert_eq!(draft.build_request(today()).unwrap_err(), FormError::ExceedsAvailable);
    }

    #[test]
    fn test_selecting_product_drops_rows() {
        let mut draft = draft();
        draft.set_quantity(1, "2");
        draft.clear_after_submit();
        assert_eq!(draft.rows.len(), 2);
        draft.select_product(Some(3));
        assert!(draft.rows.is_empty());
        assert_eq!(draft.product_id, Some(3));
    }
}
