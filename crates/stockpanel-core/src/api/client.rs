//! API client for the inventory backend.
//!
//! This module provides the `ApiClient` struct for making public (sign-in,
//! registration) and session-authenticated requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, multipart, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::SessionGuard;
use crate::config::Config;
use crate::models::{
    Category, CategoryInput, CategoryPage, DashboardStats, FormError, LoginRequest,
    LoginResponse, LowStockItem, NewProduct, NewUser, Product, ProductDetail, ProductPage,
    ProductWarehouseStock, ProductWarehouses, Registration, ReportKind, ReportRows,
    StockOutRequest, UserPage, UserUpdate, Warehouse, WarehouseInput, WarehouseList,
};

use super::{ApiEnvelope, ApiError};

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by every endpoint.
const API_PREFIX: &str = "/api/v1";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Page size used when the whole product list is wanted, e.g. for the
/// stock-out product picker.
pub const ALL_PRODUCTS_LIMIT: u32 = 1000;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Deserialize)]
struct ProductList {
    #[serde(default)]
    products: Vec<Product>,
}

/// Dashboard figures plus the low-stock table shown beneath them.
#[derive(Debug, Clone, Default)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub low_stock: Vec<LowStockItem>,
}

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Session,
}

/// API client for the inventory backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionGuard>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: Arc<SessionGuard>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "API client created");

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn from_config(config: &Config, session: Arc<SessionGuard>) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionGuard> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }

    /// Headers for one request. A fresh request id every time; the token is
    /// read from storage now so it reflects other tabs' changes.
    fn headers(&self, access: Access) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            REQUEST_ID_HEADER,
            header::HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if access == Access::Session {
            if let Some(token) = self.session.auth_token() {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token))?,
                );
            }
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Request failed");
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, rebuilding and retrying it with exponential backoff
    /// while the server answers 429.
    async fn send<F>(&self, url: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<ApiEnvelope<T>> {
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        let response = self
            .send(&url, || {
                Ok(self
                    .client
                    .get(&url)
                    .headers(self.headers(Access::Session)?)
                    .query(query))
            })
            .await?;
        Ok(Self::read_envelope::<T>(response, &url).await?.into_result()?)
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        access: Access,
    ) -> Result<ApiEnvelope<Value>> {
        let url = self.url(path);
        let response = self
            .send(&url, || {
                Ok(self.client.post(&url).headers(self.headers(access)?).json(body))
            })
            .await?;
        Self::read_envelope(response, &url).await
    }

    async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        let response = self
            .send(&url, || {
                Ok(self
                    .client
                    .put(&url)
                    .headers(self.headers(Access::Session)?)
                    .json(body))
            })
            .await?;
        Ok(Self::read_envelope::<Value>(response, &url).await?.into_ack()?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        let response = self
            .send(&url, || {
                Ok(self
                    .client
                    .delete(&url)
                    .headers(self.headers(Access::Session)?))
            })
            .await?;
        Ok(Self::read_envelope::<Value>(response, &url).await?.into_ack()?)
    }

    // ===== Authentication =====

    /// Create an account. Returns the server's message, if any.
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>> {
        let data = self
            .post("auth/register", registration, Access::Public)
            .await
            .context("Registration failed")?
            .into_optional()?;
        info!(email = %registration.email, "Account registered");
        Ok(data.and_then(|d| d.get("message").and_then(Value::as_str).map(str::to_string)))
    }

    /// Sign in and store the token and profile in the session.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let data = self
            .post("auth/login", request, Access::Public)
            .await
            .context("Login failed")?
            .into_result()?;
        let login: LoginResponse =
            serde_json::from_value(data).context("Failed to parse login response")?;

        // Token last: other tabs react to the token key and read the rest
        self.session.set_user_data(&login.user);
        self.session.set_auth_token(&login.token, login.expires_at);
        info!(email = %request.email, admin = login.user.is_admin(), "Signed in");
        Ok(login)
    }

    // ===== Products =====

    pub async fn fetch_products(&self, page: u32, limit: u32, search: &str) -> Result<ProductPage> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if !search.trim().is_empty() {
            query.push(("search", search.trim().to_string()));
        }
        self.get("products", &query)
            .await
            .context("Failed to load products")
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Product> {
        let detail: ProductDetail = self
            .get(&format!("products/{}", id), &[])
            .await
            .context("Failed to load product details")?;
        Ok(detail.product)
    }

    /// Name/code suggestions for the search box.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let list: ProductList = self
            .get("products/search", &[("query", query.to_string())])
            .await
            .context("Product search failed")?;
        Ok(list.products)
    }

    pub async fn add_product(&self, product: &NewProduct) -> Result<()> {
        self.post("products", product, Access::Session)
            .await
            .context("Failed to add product")?
            .into_ack()?;
        info!(name = %product.name, "Product added");
        Ok(())
    }

    /// Bulk import from a spreadsheet. Only `.xlsx` and `.csv` are accepted.
    pub async fn upload_products(&self, path: &Path) -> Result<()> {
        let mime = upload_mime(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("products")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let url = self.url("products/upload");
        let response = self
            .send(&url, || {
                let part = multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                let mut headers = self.headers(Access::Session)?;
                // reqwest sets the multipart boundary itself.
                headers.remove(header::CONTENT_TYPE);
                Ok(self
                    .client
                    .post(&url)
                    .headers(headers)
                    .multipart(multipart::Form::new().part("file", part)))
            })
            .await
            .context("Product upload failed")?;
        Self::read_envelope::<Value>(response, &url).await?.into_ack()?;
        info!(file = %file_name, "Products uploaded");
        Ok(())
    }

    /// Per-warehouse availability of one product.
    pub async fn fetch_product_warehouses(&self, id: i64) -> Result<Vec<ProductWarehouseStock>> {
        let list: ProductWarehouses = self
            .get(&format!("products/{}/warehouses", id), &[])
            .await
            .context("Failed to load warehouses for product")?;
        Ok(list.warehouses)
    }

    // ===== Categories =====

    pub async fn fetch_categories(&self, page: u32, limit: u32) -> Result<CategoryPage> {
        self.get(
            "categories",
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
        .context("Failed to load categories")
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<()> {
        self.post("categories", input, Access::Session)
            .await
            .context("Failed to create category")?
            .into_ack()?;
        Ok(())
    }

    pub async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<()> {
        self.put(&format!("categories/{}", id), input)
            .await
            .context("Failed to update category")
    }

    pub async fn delete_category(&self, category: &Category) -> Result<()> {
        self.delete(&format!("categories/{}", category.id))
            .await
            .context("Failed to delete category")?;
        info!(id = category.id, name = %category.name, "Category deleted");
        Ok(())
    }

    // ===== Warehouses =====

    pub async fn fetch_warehouses(&self) -> Result<Vec<Warehouse>> {
        let list: WarehouseList = self
            .get("warehouses", &[])
            .await
            .context("Failed to load warehouses")?;
        Ok(list.warehouses)
    }

    pub async fn create_warehouse(&self, input: &WarehouseInput) -> Result<()> {
        self.post("warehouses", input, Access::Session)
            .await
            .context("Failed to create warehouse")?
            .into_ack()?;
        Ok(())
    }

    pub async fn update_warehouse(&self, id: i64, input: &WarehouseInput) -> Result<()> {
        self.put(&format!("warehouses/{}", id), input)
            .await
            .context("Failed to update warehouse")
    }

    pub async fn delete_warehouse(&self, warehouse: &Warehouse) -> Result<()> {
        self.delete(&format!("warehouses/{}", warehouse.id))
            .await
            .context("Failed to delete warehouse")?;
        info!(id = warehouse.id, name = %warehouse.name, "Warehouse deleted");
        Ok(())
    }

    // ===== Users =====

    pub async fn fetch_users(&self, page: u32, limit: u32, q: &str) -> Result<UserPage> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if !q.trim().is_empty() {
            query.push(("q", q.trim().to_string()));
        }
        self.get("users", &query).await.context("Failed to load users")
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<()> {
        self.post("users", user, Access::Session)
            .await
            .context("Failed to create user")?
            .into_ack()?;
        info!(email = %user.email, "User created");
        Ok(())
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<()> {
        self.put(&format!("users/{}", id), update)
            .await
            .context("Failed to update user")
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.delete(&format!("users/{}", id))
            .await
            .context("Failed to delete user")?;
        info!(id, "User deleted");
        Ok(())
    }

    // ===== Stock =====

    pub async fn record_stock_out(&self, request: &StockOutRequest) -> Result<()> {
        self.post("stock/out", request, Access::Session)
            .await
            .context("Failed to record stock out")?
            .into_ack()?;
        info!(
            product_id = request.product_id,
            lines = request.lines.len(),
            "Stock out recorded"
        );
        Ok(())
    }

    // ===== Reports =====

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats> {
        self.get("reports/dashboard", &[])
            .await
            .context("Failed to fetch dashboard stats")
    }

    pub async fn fetch_report(&self, kind: ReportKind) -> Result<ReportRows> {
        let data: Value = self
            .get(&format!("reports/{}", kind.key()), &[])
            .await
            .with_context(|| format!("Failed to fetch {}", kind.title()))?;
        kind.parse(&data)
            .with_context(|| format!("Failed to parse {}", kind.title()))
    }

    /// Stats and the low-stock list, fetched concurrently.
    pub async fn fetch_dashboard_overview(&self) -> Result<DashboardOverview> {
        let (stats, low_stock) = futures::future::try_join(
            self.fetch_dashboard_stats(),
            self.fetch_report(ReportKind::LowStock),
        )
        .await?;

        let low_stock = match low_stock {
            ReportRows::LowStock(rows) => rows,
            _ => Vec::new(),
        };
        Ok(DashboardOverview { stats, low_stock })
    }

    /// Raw PDF bytes for a report.
    pub async fn download_report_pdf(&self, kind: ReportKind) -> Result<Vec<u8>> {
        let url = self.url(&format!("reports/pdf/{}", kind.key()));
        let response = self
            .send(&url, || {
                Ok(self
                    .client
                    .get(&url)
                    .headers(self.headers(Access::Session)?))
            })
            .await
            .context("Failed to download PDF")?;
        let bytes = response
            .bytes()
            .await
            .map_err(ApiError::from)
            .context("Failed to read PDF body")?;
        Ok(bytes.to_vec())
    }

    /// Download a report PDF into `dir` as `<Report Title>.pdf`.
    pub async fn save_report_pdf(&self, kind: ReportKind, dir: &Path) -> Result<PathBuf> {
        let bytes = self.download_report_pdf(kind).await?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(kind.pdf_file_name());
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(report = %kind, path = %path.display(), bytes = bytes.len(), "Report saved");
        Ok(path)
    }
}

/// MIME type for an importable spreadsheet, judged by extension.
pub fn upload_mime(path: &Path) -> std::result::Result<&'static str, FormError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") => Ok("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        Some("csv") => Ok("text/csv"),
        _ => Err(FormError::UnsupportedFile),
    }
}
