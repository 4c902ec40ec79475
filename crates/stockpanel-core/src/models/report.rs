//! Report kinds and their rows.
//!
//! Each report endpoint answers `{ "<data key>": [ rows ] }`; `ReportKind`
//! carries the key, title and column layout so the UI and the PDF export
//! agree on names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient_amount, lenient_i64};
use crate::utils::format::{format_currency, format_report_date, truncate_text};

/// Report cells are cut to this many characters.
pub const REPORT_TEXT_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    LowStock,
    OutOfStock,
    StockByWarehouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportColumn {
    pub key: &'static str,
    pub label: &'static str,
}

const fn col(key: &'static str, label: &'static str) -> ReportColumn {
    ReportColumn { key, label }
}

const LOW_STOCK_COLUMNS: &[ReportColumn] = &[
    col("name", "Product Name"),
    col("code", "Code"),
    col("brand", "Brand"),
    col("cost", "Cost"),
    col("total_quantity", "Qty"),
    col("grn_date", "GRN Date"),
    col("remarks", "Remarks"),
];

const OUT_OF_STOCK_COLUMNS: &[ReportColumn] = &[
    col("name", "Product Name"),
    col("code", "Code"),
    col("brand", "Brand"),
    col("cost", "Cost"),
    col("grn_date", "GRN Date"),
    col("remarks", "Remarks"),
];

const STOCK_BY_WAREHOUSE_COLUMNS: &[ReportColumn] = &[
    col("warehouse_name", "Warehouse"),
    col("location", "Location"),
    col("total_quantity", "Total Qty"),
];

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::LowStock,
        ReportKind::OutOfStock,
        ReportKind::StockByWarehouse,
    ];

    /// Path segment under `reports/` and `reports/pdf/`.
    pub fn key(&self) -> &'static str {
        match self {
            ReportKind::LowStock => "low-stock",
            ReportKind::OutOfStock => "out-of-stock",
            ReportKind::StockByWarehouse => "stock-by-warehouse",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::LowStock => "Low Stock Report",
            ReportKind::OutOfStock => "Out of Stock Report",
            ReportKind::StockByWarehouse => "Stock by Warehouse",
        }
    }

    pub fn data_key(&self) -> &'static str {
        match self {
            ReportKind::LowStock => "low_stock",
            ReportKind::OutOfStock => "out_of_stock",
            ReportKind::StockByWarehouse => "stock_by_warehouse",
        }
    }

    pub fn columns(&self) -> &'static [ReportColumn] {
        match self {
            ReportKind::LowStock => LOW_STOCK_COLUMNS,
            ReportKind::OutOfStock => OUT_OF_STOCK_COLUMNS,
            ReportKind::StockByWarehouse => STOCK_BY_WAREHOUSE_COLUMNS,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// File name used when saving the PDF.
    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", self.title())
    }

    /// Pull this report's rows out of the `data` object. A missing key is
    /// an empty report.
    pub fn parse(&self, data: &Value) -> Result<ReportRows, serde_json::Error> {
        let rows = data.get(self.data_key()).cloned().unwrap_or(Value::Null);
        let rows = if rows.is_null() { Value::Array(Vec::new()) } else { rows };
        Ok(match self {
            ReportKind::LowStock => ReportRows::LowStock(serde_json::from_value(rows)?),
            ReportKind::OutOfStock => ReportRows::OutOfStock(serde_json::from_value(rows)?),
            ReportKind::StockByWarehouse => {
                ReportRows::StockByWarehouse(serde_json::from_value(rows)?)
            }
        })
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cost: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_quantity: Option<i64>,
    #[serde(default)]
    pub grn_date: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStockItem {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cost: Option<String>,
    #[serde(default)]
    pub grn_date: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseStockRow {
    pub warehouse_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRows {
    LowStock(Vec<LowStockItem>),
    OutOfStock(Vec<OutOfStockItem>),
    StockByWarehouse(Vec<WarehouseStockRow>),
}

impl ReportRows {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRows::LowStock(_) => ReportKind::LowStock,
            ReportRows::OutOfStock(_) => ReportKind::OutOfStock,
            ReportRows::StockByWarehouse(_) => ReportKind::StockByWarehouse,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReportRows::LowStock(rows) => rows.len(),
            ReportRows::OutOfStock(rows) => rows.len(),
            ReportRows::StockByWarehouse(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display cells in column order.
    pub fn cells(&self) -> Vec<Vec<String>> {
        match self {
            ReportRows::LowStock(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        text(Some(&r.name)),
                        text(r.code.as_deref()),
                        text(r.brand.as_deref()),
                        format_currency(r.cost.as_deref()),
                        quantity(r.total_quantity),
                        format_report_date(r.grn_date.as_deref()),
                        text(r.remarks.as_deref()),
                    ]
                })
                .collect(),
            ReportRows::OutOfStock(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        text(Some(&r.name)),
                        text(r.code.as_deref()),
                        text(r.brand.as_deref()),
                        format_currency(r.cost.as_deref()),
                        format_report_date(r.grn_date.as_deref()),
                        text(r.remarks.as_deref()),
                    ]
                })
                .collect(),
            ReportRows::StockByWarehouse(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        text(Some(&r.warehouse_name)),
                        text(r.location.as_deref()),
                        quantity(r.total_quantity),
                    ]
                })
                .collect(),
        }
    }
}

fn text(value: Option<&str>) -> String {
    truncate_text(value, REPORT_TEXT_LIMIT)
}

fn quantity(value: Option<i64>) -> String {
    value.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Headline figures on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_products: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_stock: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub low_stock_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub category_count: Option<i64>,
}

impl DashboardStats {
    /// (title, value) pairs in card order.
    pub fn cards(&self) -> [(&'static str, Option<i64>); 4] {
        [
            ("Total Products", self.total_products),
            ("Total Stock", self.total_stock),
            ("Low Stock Count", self.low_stock_count),
            ("Categories", self.category_count),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_keys() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ReportKind::from_key("daily"), None);
        assert_eq!(ReportKind::OutOfStock.pdf_file_name(), "Out of Stock Report.pdf");
        assert_eq!(ReportKind::StockByWarehouse.to_string(), "stock-by-warehouse");
    }

    #[test]
    fn test_columns_match_cells() {
        let data = json!({
            "low_stock": [{"name": "Tape", "cost": 120, "total_quantity": "3", "grn_date": "2025-11-17"}],
            "out_of_stock": [{"name": "Glue"}],
            "stock_by_warehouse": [{"warehouse_name": "Main", "total_quantity": 88}]
        });
        for kind in ReportKind::ALL {
            let rows = kind.parse(&data).unwrap();
            assert_eq!(rows.kind(), kind);
            assert_eq!(rows.len(), 1);
            assert_eq!(rows.cells()[0].len(), kind.columns().len());
        }
    }

    #[test]
    fn test_low_stock_cells() {
        let rows = ReportKind::LowStock
            .parse(&json!({"low_stock": [{"name": "Tape", "cost": "120.50", "total_quantity": 3, "grn_date": "2025-11-17T00:00:00Z"}]}))
            .unwrap();
        assert_eq!(
            rows.cells()[0],
            vec!["Tape", "-", "-", "Rs. 120.50", "3", "17/11/2025", "-"]
        );
    }

    #[test]
    fn test_missing_key_is_empty() {
        let rows = ReportKind::OutOfStock.parse(&json!({})).unwrap();
        assert!(rows.is_empty());
        let rows = ReportKind::OutOfStock.parse(&json!({"out_of_stock": null})).unwrap();
        assert!(rows.is_empty());
        assert!(ReportKind::OutOfStock.parse(&json!({"out_of_stock": 5})).is_err());
    }

    #[test]
    fn test_dashboard_stats() {
        let stats: DashboardStats =
            serde_json::from_value(json!({"total_products": 12, "total_stock": "400", "low_stock_count": 2})).unwrap();
        let cards = stats.cards();
        assert_eq!(cards[1], ("Total Stock", Some(400)));
        assert_eq!(cards[3], ("Categories", None));
    }
}
