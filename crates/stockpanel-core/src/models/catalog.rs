//! Categories, warehouses and the pagination block shared by list endpoints.

use serde::{Deserialize, Serialize};

use super::validation::{required, FormError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPage {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Body for creating or renaming a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInput {
    pub name: String,
}

impl CategoryInput {
    pub fn new(name: &str) -> Result<Self, FormError> {
        Ok(Self {
            name: required("Name", name)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseList {
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseInput {
    pub name: String,
    pub location: String,
}

impl WarehouseInput {
    pub fn new(name: &str, location: &str) -> Result<Self, FormError> {
        Ok(Self {
            name: required("Name", name)?,
            location: location.trim().to_string(),
        })
    }
}

/// Pagination block returned beside paged lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "totalPages", default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: None,
            total: 0,
            total_pages: 1,
        }
    }
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_parse() {
        let p: Pagination =
            serde_json::from_str(r#"{"page":2,"limit":10,"total":35,"totalPages":4}"#).unwrap();
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next());
        assert!(p.has_prev());

        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pagination::default());
        assert!(!p.has_next());
        assert!(!p.has_prev());
    }

    #[test]
    fn test_category_input_requires_name() {
        assert_eq!(CategoryInput::new("  ").unwrap_err(), FormError::Required("Name"));
        assert_eq!(CategoryInput::new(" Tools ").unwrap().name, "Tools");
    }

    #[test]
    fn test_warehouse_input_requires_name() {
        assert_eq!(
            WarehouseInput::new(" ", "Colombo").unwrap_err(),
            FormError::Required("Name")
        );
        let input = WarehouseInput::new("Main", " Colombo ").unwrap();
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"name": "Main", "location": "Colombo"})
        );
    }

    #[test]
    fn test_warehouse_without_location() {
        let w: Warehouse = serde_json::from_str(r#"{"id":3,"name":"Annex"}"#).unwrap();
        assert_eq!(w.location, None);
    }
}
