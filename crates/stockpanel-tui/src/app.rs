//! Application state management for StockPanel.
//!
//! This module contains the core `App` struct that manages all application state,
//! including UI state, loaded data, session wiring, and background task coordination.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use stockpanel_core::api::client::{upload_mime, ALL_PRODUCTS_LIMIT};
use stockpanel_core::api::{ApiClient, ApiError, DashboardOverview};
use stockpanel_core::auth::{Route, SessionCallback, SessionGuard, SharedStorage, SystemClock};
use stockpanel_core::models::{
    Category, CategoryInput, CategoryPage, FormError, LoginRequest, LoginResponse, NewProduct,
    NewUser, Product, ProductPage, ProductWarehouseStock, Registration, ReportKind, ReportRows,
    StockOutDraft, User, UserPage, UserProfile, UserUpdate, Warehouse, WarehouseInput,
};
use stockpanel_core::utils::clamp_page;
use stockpanel_core::Config;

use crate::form::Form;
use crate::session::{self, AppEvent, ChannelNavigator, SESSION_EXPIRED_MESSAGE};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Rows per page for products, categories and users.
pub const PAGE_SIZE: u32 = 10;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Search suggestions start after this many characters.
const MIN_SUGGESTION_QUERY: usize = 2;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Dashboard,
    Products,
    Inventory,
    StockOut,
    Users,
    Reports,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Products,
        Tab::Inventory,
        Tab::StockOut,
        Tab::Users,
        Tab::Reports,
    ];

    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Products => "Products",
            Tab::Inventory => "Inventory",
            Tab::StockOut => "Stock Out",
            Tab::Users => "Users",
            Tab::Reports => "Reports",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Products,
            Tab::Products => Tab::Inventory,
            Tab::Inventory => Tab::StockOut,
            Tab::StockOut => Tab::Users,
            Tab::Users => Tab::Reports,
            Tab::Reports => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Reports,
            Tab::Products => Tab::Dashboard,
            Tab::Inventory => Tab::Products,
            Tab::StockOut => Tab::Inventory,
            Tab::Users => Tab::StockOut,
            Tab::Reports => Tab::Users,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Tab::Dashboard => Route::Dashboard,
            Tab::Products => Route::Products,
            Tab::Inventory => Route::Inventory,
            Tab::StockOut => Route::Stock,
            Tab::Users => Route::Users,
            Tab::Reports => Route::Reports,
        }
    }

    /// Tab showing a protected route. Categories and warehouses share the
    /// inventory tab.
    pub fn from_route(route: Route) -> Option<Self> {
        match route {
            Route::Dashboard => Some(Tab::Dashboard),
            Route::Products => Some(Tab::Products),
            Route::Inventory | Route::Categories | Route::Warehouses => Some(Tab::Inventory),
            Route::Stock => Some(Tab::StockOut),
            Route::Users => Some(Tab::Users),
            Route::Reports => Some(Tab::Reports),
            Route::Root | Route::Login | Route::Register => None,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    LoggingIn,
    Registering,
    EditingForm,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Which list has focus on the inventory tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryPane {
    Categories,
    Warehouses,
}

/// Focus area on the stock-out tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockFocus {
    Products,
    Quantities,
    Details,
}

/// Labels of the stock-out detail fields, in focus order.
pub const STOCK_DETAIL_FIELDS: [&str; 3] = ["Transaction Date", "Reference No", "Remarks"];

/// What an open editor form will do on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    NewProduct,
    UploadProducts,
    NewCategory,
    EditCategory(i64),
    NewWarehouse,
    EditWarehouse(i64),
    NewUser,
    EditUser(i64),
}

/// Record awaiting delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Category(Category),
    Warehouse(Warehouse),
    User(User),
}

impl DeleteTarget {
    pub fn prompt(&self) -> String {
        match self {
            DeleteTarget::Category(c) => format!("Delete category \"{}\"?", c.name),
            DeleteTarget::Warehouse(w) => format!("Delete warehouse \"{}\"?", w.name),
            DeleteTarget::User(u) => {
                format!("Delete user \"{}\"? This cannot be undone.", u.full_name)
            }
        }
    }
}

/// List to reload after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reload {
    Products,
    Categories,
    Warehouses,
    Users,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Result types from background tasks.
///
/// Each task sends one of these through the MPSC channel back to the main
/// application, which applies it between frames.
enum TaskResult {
    LoggedIn(Result<LoginResponse>),
    Registered(String, Result<Option<String>>),
    Dashboard(Result<DashboardOverview>),
    Products(Result<ProductPage>),
    ProductDetail(Result<Product>),
    Suggestions(String, Result<Vec<Product>>),
    Categories(Result<CategoryPage>),
    CategoryOptions(Result<CategoryPage>),
    Warehouses(Result<Vec<Warehouse>>),
    PickerProducts(Result<Vec<Product>>),
    ProductWarehouses(i64, Result<Vec<ProductWarehouseStock>>),
    Users(Result<UserPage>),
    Report(ReportKind, Result<ReportRows>),
    Saved {
        notice: &'static str,
        reload: Reload,
        result: Result<()>,
    },
    StockOutRecorded(i64, Result<()>),
    PdfSaved(Result<PathBuf>),
}

/// A task result tagged with the session generation that started it.
struct TaskMessage {
    generation: u64,
    result: TaskResult,
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionGuard>,
    pub api: ApiClient,
    on_logout: SessionCallback,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Background task channel
    task_tx: mpsc::Sender<TaskMessage>,
    task_rx: mpsc::Receiver<TaskMessage>,
    /// Bumped on every full reload; results from older tasks are dropped.
    generation: u64,
    pending_tasks: usize,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub status_message: Option<String>,
    pub profile: Option<UserProfile>,
    pub search_query: String,
    loaded_tabs: Vec<Tab>,

    // Forms
    pub login_form: Form,
    pub register_form: Form,
    pub edit_form: Option<(FormKind, Form)>,
    pub pending_delete: Option<DeleteTarget>,

    // Dashboard
    pub dashboard: Option<DashboardOverview>,

    // Products tab
    pub products: ProductPage,
    pub products_page: u32,
    pub products_search: String,
    pub product_selection: usize,
    pub product_detail: Option<Product>,
    pub suggestions: Vec<Product>,

    // Inventory tab
    pub categories: CategoryPage,
    pub categories_page: u32,
    pub category_selection: usize,
    pub category_options: Vec<Category>,
    pub warehouses: Vec<Warehouse>,
    pub warehouse_selection: usize,
    pub inventory_pane: InventoryPane,

    // Stock out tab
    pub picker_products: Vec<Product>,
    pub picker_selection: usize,
    pub stock_draft: StockOutDraft,
    pub stock_focus: StockFocus,
    pub stock_row_selection: usize,
    pub stock_detail_field: usize,
    pub stock_submitting: bool,

    // Users tab
    pub users: UserPage,
    pub users_page: u32,
    pub users_query: String,
    pub user_selection: usize,
    pub user_detail_open: bool,

    // Reports tab
    pub report_kind_selection: usize,
    pub report: Option<ReportRows>,
    pub report_selection: usize,
    pub exporting_pdf: bool,
}

fn login_form(email: &str) -> Form {
    Form::new("Welcome back", "Login")
        .field("Email", email)
        .secret("Password")
}

fn register_form() -> Form {
    Form::new("Create an account", "Register")
        .field("Full name", "")
        .field("Email", "")
        .secret("Password")
}

impl App {
    /// Create the application for one session storage area.
    pub fn new(config: Config, storage: &SharedStorage) -> Result<Self> {
        let (event_tx, events_rx) = mpsc::unbounded_channel();
        let session = SessionGuard::new(
            storage.open_tab(),
            Arc::new(SystemClock),
            Arc::new(ChannelNavigator::new(event_tx.clone())),
        );
        let api = ApiClient::from_config(&config, Arc::clone(&session))?;
        debug!(base_url = api.base_url(), "API client configured");

        let on_logout = session::logout_callback(&session, event_tx.clone());
        session.init_auth_guard(Arc::clone(&on_logout), session::login_callback(event_tx));

        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let mut login = login_form(&config.default_email().unwrap_or_default());
        if let Some(password) = Config::env_password() {
            login.set_value(1, password);
        }
        login.focus_first_empty();

        let profile = session.user_data();

        Ok(Self {
            config,
            session,
            api,
            on_logout,
            events_rx,

            task_tx,
            task_rx,
            generation: 0,
            pending_tasks: 0,

            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            status_message: None,
            profile,
            search_query: String::new(),
            loaded_tabs: Vec::new(),

            login_form: login,
            register_form: register_form(),
            edit_form: None,
            pending_delete: None,

            dashboard: None,

            products: ProductPage::default(),
            products_page: 1,
            products_search: String::new(),
            product_selection: 0,
            product_detail: None,
            suggestions: Vec::new(),

            categories: CategoryPage::default(),
            categories_page: 1,
            category_selection: 0,
            category_options: Vec::new(),
            warehouses: Vec::new(),
            warehouse_selection: 0,
            inventory_pane: InventoryPane::Categories,

            picker_products: Vec::new(),
            picker_selection: 0,
            stock_draft: StockOutDraft::new(Local::now().date_naive()),
            stock_focus: StockFocus::Products,
            stock_row_selection: 0,
            stock_detail_field: 0,
            stock_submitting: false,

            users: UserPage::default(),
            users_page: 1,
            users_query: String::new(),
            user_selection: 0,
            user_detail_open: false,

            report_kind_selection: 0,
            report: None,
            report_selection: 0,
            exporting_pdf: false,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.pending_tasks > 0
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Enter a route, following guard redirects.
    pub fn open(&mut self, route: Route) {
        let resolved = route.resolve(&self.session);
        if resolved != route {
            debug!(from = route.path(), to = resolved.path(), "Route redirected");
        }
        match resolved {
            Route::Login | Route::Root => self.start_login(),
            Route::Register => self.start_register(),
            other => {
                let tab = Tab::from_route(other).unwrap_or(Tab::Dashboard);
                self.state = AppState::Normal;
                self.current_tab = tab;
                self.profile = self.session.user_data();
                if !self.loaded_tabs.contains(&tab) {
                    self.refresh_current_tab();
                }
            }
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.open(tab.route());
    }

    /// Full navigation: drop every piece of loaded data, then open `path`.
    fn hard_navigate(&mut self, path: &str) {
        info!(path, "Full navigation");
        let notice = self.status_message.take();
        self.reset_data();
        self.status_message = notice;
        self.open(Route::from_path(path).unwrap_or(Route::Root));
    }

    fn reset_data(&mut self) {
        self.generation += 1;
        self.pending_tasks = 0;
        self.loaded_tabs.clear();
        self.profile = None;
        self.search_query.clear();
        self.edit_form = None;
        self.pending_delete = None;
        self.login_form = login_form(self.config.last_email.as_deref().unwrap_or(""));
        self.login_form.focus_first_empty();
        self.register_form = register_form();

        self.dashboard = None;
        self.products = ProductPage::default();
        self.products_page = 1;
        self.products_search.clear();
        self.product_selection = 0;
        self.product_detail = None;
        self.suggestions.clear();
        self.categories = CategoryPage::default();
        self.categories_page = 1;
        self.category_selection = 0;
        self.category_options.clear();
        self.warehouses.clear();
        self.warehouse_selection = 0;
        self.inventory_pane = InventoryPane::Categories;
        self.picker_products.clear();
        self.picker_selection = 0;
        self.stock_draft = StockOutDraft::new(Local::now().date_naive());
        self.stock_focus = StockFocus::Products;
        self.stock_row_selection = 0;
        self.stock_detail_field = 0;
        self.stock_submitting = false;
        self.users = UserPage::default();
        self.users_page = 1;
        self.users_query.clear();
        self.user_selection = 0;
        self.user_detail_open = false;
        self.report_kind_selection = 0;
        self.report = None;
        self.report_selection = 0;
        self.exporting_pdf = false;
    }

    /// Apply session events posted by the guard's callbacks.
    pub fn process_session_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::SessionExpired => {
                    self.status_message = Some(SESSION_EXPIRED_MESSAGE.to_string());
                }
                AppEvent::SessionRestored => {
                    info!("Signed in from another window");
                    self.profile = self.session.user_data();
                    if matches!(self.state, AppState::LoggingIn | AppState::Registering) {
                        self.open(Route::Dashboard);
                    }
                }
                AppEvent::Navigate(path) => self.hard_navigate(&path),
            }
        }
    }

    /// Sign out on request.
    pub fn logout(&mut self) {
        self.status_message = Some("Signed out.".to_string());
        self.session.logout(Route::Login.path());
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Show the login overlay.
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_form.submitting = false;
        self.login_form.focus_first_empty();
    }

    pub fn start_register(&mut self) {
        self.state = AppState::Registering;
        self.register_form.error = None;
        self.register_form.submitting = false;
    }

    /// Validate the login form and sign in in the background.
    pub fn submit_login(&mut self) {
        if self.login_form.submitting {
            return;
        }
        let request = match LoginRequest::new(self.login_form.value(0), self.login_form.value(1)) {
            Ok(request) => request,
            Err(e) => {
                self.login_form.error = Some(e.to_string());
                return;
            }
        };
        self.login_form.error = None;
        self.login_form.submitting = true;
        let api = self.api.clone();
        self.spawn(async move { TaskResult::LoggedIn(api.login(&request).await) });
    }

    pub fn submit_register(&mut self) {
        if self.register_form.submitting {
            return;
        }
        let form = &self.register_form;
        let registration = match Registration::new(form.value(0), form.value(1), form.value(2)) {
            Ok(registration) => registration,
            Err(e) => {
                self.register_form.error = Some(e.to_string());
                return;
            }
        };
        self.register_form.error = None;
        self.register_form.submitting = true;
        let api = self.api.clone();
        let email = registration.email.clone();
        self.spawn(async move {
            TaskResult::Registered(email, api.register(&registration).await)
        });
    }

    fn on_logged_in(&mut self, login: LoginResponse) {
        self.login_form.submitting = false;
        self.login_form.clear_secrets();
        self.status_message = Some(
            login
                .message
                .clone()
                .unwrap_or_else(|| "Login successful!".to_string()),
        );

        self.config.last_email = login.user.email.clone().or_else(|| {
            Some(self.login_form.value(0).trim().to_string()).filter(|e| !e.is_empty())
        });
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.session.schedule_auto_logout(Arc::clone(&self.on_logout));
        self.profile = Some(login.user);
        self.open(Route::Dashboard);
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        let generation = self.generation;
        self.pending_tasks += 1;
        tokio::spawn(async move {
            let result = task.await;
            if tx.send(TaskMessage { generation, result }).await.is_err() {
                debug!("Task finished after the app closed");
            }
        });
    }

    /// Apply finished background work. Called once per frame.
    pub fn check_background_tasks(&mut self) {
        while let Ok(message) = self.task_rx.try_recv() {
            if message.generation != self.generation {
                debug!("Dropping result from before the last reload");
                continue;
            }
            self.pending_tasks = self.pending_tasks.saturating_sub(1);
            self.process_task_result(message.result);
        }
    }

    /// Report a failed request. A 401 ends the session like an expiry does.
    fn handle_error(&mut self, e: anyhow::Error) {
        if ApiError::is_unauthorized(&e) {
            warn!(error = %e, "Request unauthorized, ending session");
            (self.on_logout)();
            return;
        }
        error!(error = format!("{:#}", e), "Request failed");
        self.status_message = Some(ApiError::user_message(&e));
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::LoggedIn(Ok(login)) => self.on_logged_in(login),
            TaskResult::LoggedIn(Err(e)) => {
                self.login_form.submitting = false;
                self.login_form.error = Some(login_error_message(&e));
                error!(error = %e, "Login failed");
            }
            TaskResult::Registered(email, Ok(message)) => {
                self.register_form = register_form();
                self.status_message =
                    Some(message.unwrap_or_else(|| "Registration successful!".to_string()));
                self.login_form.set_value(0, email);
                self.open(Route::Login);
            }
            TaskResult::Registered(_, Err(e)) => {
                self.register_form.submitting = false;
                self.register_form.error = Some(ApiError::user_message(&e));
            }
            TaskResult::Dashboard(Ok(overview)) => {
                self.dashboard = Some(overview);
                self.mark_loaded(Tab::Dashboard);
            }
            TaskResult::Products(Ok(page)) => {
                self.products_page = page.pagination.page.max(1);
                self.product_selection = self
                    .product_selection
                    .min(page.products.len().saturating_sub(1));
                self.products = page;
                self.mark_loaded(Tab::Products);
            }
            TaskResult::ProductDetail(Ok(product)) => self.product_detail = Some(product),
            TaskResult::Suggestions(query, Ok(products)) => {
                if query == self.search_query {
                    self.suggestions = products;
                }
            }
            TaskResult::Suggestions(query, Err(e)) => {
                debug!(query = %query, error = %e, "Suggestions unavailable");
                self.suggestions.clear();
            }
            TaskResult::Categories(Ok(page)) => {
                self.categories_page = page.pagination.page.max(1);
                self.category_selection = self
                    .category_selection
                    .min(page.categories.len().saturating_sub(1));
                self.categories = page;
                self.mark_loaded(Tab::Inventory);
            }
            TaskResult::CategoryOptions(Ok(page)) => self.category_options = page.categories,
            TaskResult::Warehouses(Ok(warehouses)) => {
                self.warehouse_selection =
                    self.warehouse_selection.min(warehouses.len().saturating_sub(1));
                self.warehouses = warehouses;
            }
            TaskResult::PickerProducts(Ok(products)) => {
                self.picker_products = products;
                self.mark_loaded(Tab::StockOut);
            }
            TaskResult::ProductWarehouses(product_id, Ok(rows)) => {
                if self.stock_draft.product_id == Some(product_id) {
                    self.stock_draft.set_warehouses(rows);
                    self.stock_row_selection = 0;
                }
            }
            TaskResult::Users(Ok(page)) => {
                self.users_page = page.meta.page.max(1);
                self.user_selection = self.user_selection.min(page.data.len().saturating_sub(1));
                self.users = page;
                self.mark_loaded(Tab::Users);
            }
            TaskResult::Report(kind, Ok(rows)) => {
                if self.selected_report_kind() == kind {
                    self.report = Some(rows);
                    self.report_selection = 0;
                }
                self.mark_loaded(Tab::Reports);
            }
            TaskResult::Saved {
                notice,
                reload,
                result,
            } => match result {
                Ok(()) => {
                    info!(notice, "Saved");
                    self.status_message = Some(notice.to_string());
                    self.edit_form = None;
                    if self.state == AppState::EditingForm {
                        self.state = AppState::Normal;
                    }
                    self.reload(reload);
                }
                Err(e) => {
                    let unauthorized = ApiError::is_unauthorized(&e);
                    if let Some((_, form)) = self.edit_form.as_mut() {
                        form.submitting = false;
                        if !unauthorized {
                            form.error = Some(ApiError::user_message(&e));
                        }
                    }
                    self.handle_error(e);
                }
            },
            TaskResult::StockOutRecorded(product_id, result) => {
                self.stock_submitting = false;
                match result {
                    Ok(()) => {
                        self.status_message = Some("Stock out recorded successfully.".to_string());
                        self.stock_draft.clear_after_submit();
                        self.fetch_product_warehouses(product_id);
                    }
                    Err(e) => self.handle_error(e),
                }
            }
            TaskResult::PdfSaved(result) => {
                self.exporting_pdf = false;
                match result {
                    Ok(path) => {
                        self.status_message = Some(format!("Saved {}", path.display()));
                    }
                    Err(e) => self.handle_error(e),
                }
            }
            TaskResult::Dashboard(Err(e))
            | TaskResult::Products(Err(e))
            | TaskResult::ProductDetail(Err(e))
            | TaskResult::Categories(Err(e))
            | TaskResult::CategoryOptions(Err(e))
            | TaskResult::Warehouses(Err(e))
            | TaskResult::PickerProducts(Err(e))
            | TaskResult::ProductWarehouses(_, Err(e))
            | TaskResult::Users(Err(e))
            | TaskResult::Report(_, Err(e)) => self.handle_error(e),
        }
    }

    fn mark_loaded(&mut self, tab: Tab) {
        if !self.loaded_tabs.contains(&tab) {
            self.loaded_tabs.push(tab);
        }
    }

    fn reload(&mut self, reload: Reload) {
        match reload {
            Reload::Products => self.fetch_products(),
            Reload::Categories => {
                self.fetch_categories();
                self.fetch_category_options();
            }
            Reload::Warehouses => self.fetch_warehouses(),
            Reload::Users => self.fetch_users(),
        }
    }

    // =========================================================================
    // Data Fetching
    // =========================================================================

    /// Reload everything the current tab shows.
    pub fn refresh_current_tab(&mut self) {
        match self.current_tab {
            Tab::Dashboard => self.fetch_dashboard(),
            Tab::Products => {
                self.fetch_products();
                self.fetch_category_options();
            }
            Tab::Inventory => {
                self.fetch_categories();
                self.fetch_warehouses();
            }
            Tab::StockOut => {
                self.fetch_picker_products();
                if let Some(product_id) = self.stock_draft.product_id {
                    self.fetch_product_warehouses(product_id);
                }
            }
            Tab::Users => self.fetch_users(),
            Tab::Reports => self.fetch_report(),
        }
    }

    pub fn fetch_dashboard(&mut self) {
        let api = self.api.clone();
        self.spawn(async move { TaskResult::Dashboard(api.fetch_dashboard_overview().await) });
    }

    pub fn fetch_products(&mut self) {
        let api = self.api.clone();
        let page = self.products_page;
        let search = self.products_search.clone();
        self.spawn(async move {
            TaskResult::Products(api.fetch_products(page, PAGE_SIZE, &search).await)
        });
    }

    pub fn fetch_product_detail(&mut self) {
        let Some(id) = self.products.products.get(self.product_selection).map(|p| p.id) else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move { TaskResult::ProductDetail(api.fetch_product(id).await) });
    }

    /// Suggestions for the product search box.
    pub fn fetch_suggestions(&mut self) {
        let query = self.search_query.clone();
        if query.trim().chars().count() < MIN_SUGGESTION_QUERY {
            self.suggestions.clear();
            return;
        }
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.search_products(query.trim()).await;
            TaskResult::Suggestions(query, result)
        });
    }

    pub fn fetch_categories(&mut self) {
        let api = self.api.clone();
        let page = self.categories_page;
        self.spawn(async move { TaskResult::Categories(api.fetch_categories(page, PAGE_SIZE).await) });
    }

    /// Every category, for resolving names typed into the product form.
    fn fetch_category_options(&mut self) {
        let api = self.api.clone();
        self.spawn(async move {
            TaskResult::CategoryOptions(
                api.fetch_categories(1, ALL_PRODUCTS_LIMIT)
                    .await,
            )
        });
    }

    pub fn fetch_warehouses(&mut self) {
        let api = self.api.clone();
        self.spawn(async move { TaskResult::Warehouses(api.fetch_warehouses().await) });
    }

    fn fetch_picker_products(&mut self) {
        let api = self.api.clone();
        self.spawn(async move {
            let result = api
                .fetch_products(1, ALL_PRODUCTS_LIMIT, "")
                .await
                .map(|page| page.products);
            TaskResult::PickerProducts(result)
        });
    }

    fn fetch_product_warehouses(&mut self, product_id: i64) {
        let api = self.api.clone();
        self.spawn(async move {
            TaskResult::ProductWarehouses(product_id, api.fetch_product_warehouses(product_id).await)
        });
    }

    pub fn fetch_users(&mut self) {
        let api = self.api.clone();
        let page = self.users_page;
        let query = self.users_query.clone();
        self.spawn(async move { TaskResult::Users(api.fetch_users(page, PAGE_SIZE, &query).await) });
    }

    pub fn selected_report_kind(&self) -> ReportKind {
        ReportKind::ALL[self.report_kind_selection.min(ReportKind::ALL.len() - 1)]
    }

    pub fn fetch_report(&mut self) {
        let kind = self.selected_report_kind();
        self.report = None;
        let api = self.api.clone();
        self.spawn(async move { TaskResult::Report(kind, api.fetch_report(kind).await) });
    }

    /// Save the selected report as a PDF in the working directory.
    pub fn export_report_pdf(&mut self) {
        if self.exporting_pdf || self.report.as_ref().map(ReportRows::is_empty).unwrap_or(true) {
            return;
        }
        let dir = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                self.status_message = Some(format!("Cannot resolve working directory: {}", e));
                return;
            }
        };
        self.exporting_pdf = true;
        let kind = self.selected_report_kind();
        let api = self.api.clone();
        self.spawn(async move { TaskResult::PdfSaved(api.save_report_pdf(kind, &dir).await) });
    }

    // =========================================================================
    // Paging
    // =========================================================================

    pub fn go_to_products_page(&mut self, page: u32) {
        let page = clamp_page(
            page,
            self.products.pagination.total_pages,
        );
        if page != self.products_page {
            self.products_page = page;
            self.product_selection = 0;
            self.product_detail = None;
            self.fetch_products();
        }
    }

    pub fn go_to_categories_page(&mut self, page: u32) {
        let page = clamp_page(
            page,
            self.categories.pagination.total_pages,
        );
        if page != self.categories_page {
            self.categories_page = page;
            self.category_selection = 0;
            self.fetch_categories();
        }
    }

    pub fn go_to_users_page(&mut self, page: u32) {
        let page = clamp_page(page, self.users.meta.pages);
        if page != self.users_page {
            self.users_page = page;
            self.user_selection = 0;
            self.fetch_users();
        }
    }

    /// Apply the search box to the current list.
    pub fn apply_search(&mut self) {
        let query = self.search_query.trim().to_string();
        self.suggestions.clear();
        match self.current_tab {
            Tab::Users => {
                self.users_query = query;
                self.users_page = 1;
                self.user_selection = 0;
                self.fetch_users();
            }
            _ => {
                self.products_search = query;
                self.products_page = 1;
                self.product_selection = 0;
                self.product_detail = None;
                self.fetch_products();
            }
        }
    }

    // =========================================================================
    // Editor Forms
    // =========================================================================

    pub fn open_form(&mut self, kind: FormKind) {
        let form = match kind {
            FormKind::NewProduct => Form::new("Add Product", "Save")
                .field("Name", "")
                .field("Code", "")
                .field("Brand", "")
                .field("Description", "")
                .field("Category", "")
                .field("Cost", "")
                .field("GRN Date", "")
                .field("Remarks", ""),
            FormKind::UploadProducts => {
                Form::new("Upload Product File (.xlsx or .csv)", "Upload").field("File path", "")
            }
            FormKind::NewCategory => Form::new("New Category", "Save").field("Name", ""),
            FormKind::EditCategory(id) => {
                let name = self
                    .categories
                    .categories
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                Form::new("Edit Category", "Save").field("Name", name)
            }
            FormKind::NewWarehouse => Form::new("New Warehouse", "Save")
                .field("Name", "")
                .field("Location", ""),
            FormKind::EditWarehouse(id) => {
                let warehouse = self.warehouses.iter().find(|w| w.id == id);
                Form::new("Edit Warehouse", "Save")
                    .field("Name", warehouse.map(|w| w.name.clone()).unwrap_or_default())
                    .field(
                        "Location",
                        warehouse.and_then(|w| w.location.clone()).unwrap_or_default(),
                    )
            }
            FormKind::NewUser => Form::new("Create User", "Create")
                .field("Full Name", "")
                .field("Email", "")
                .secret("Password"),
            FormKind::EditUser(id) => {
                let user = self.users.data.iter().find(|u| u.id == id);
                Form::new("Edit User", "Save")
                    .field("Full Name", user.map(|u| u.full_name.clone()).unwrap_or_default())
                    .field("Email", user.map(|u| u.email.clone()).unwrap_or_default())
                    .secret("New Password")
            }
        };
        self.edit_form = Some((kind, form));
        self.state = AppState::EditingForm;
    }

    pub fn close_form(&mut self) {
        if self.edit_form.as_ref().map(|(_, f)| f.submitting).unwrap_or(false) {
            return;
        }
        self.edit_form = None;
        self.state = AppState::Normal;
    }

    /// Validate the open editor and send it.
    pub fn submit_form(&mut self) {
        let Some((kind, form)) = self.edit_form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        let kind = *kind;
        let api = self.api.clone();
        let prepared = build_submission(kind, form, &self.category_options, api);
        match prepared {
            Ok(task) => {
                form.error = None;
                form.submitting = true;
                self.spawn(task);
            }
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    pub fn confirm_delete(&mut self, target: DeleteTarget) {
        self.pending_delete = Some(target);
        self.state = AppState::ConfirmingDelete;
    }

    pub fn execute_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(target) = self.pending_delete.take() else {
            return;
        };
        let api = self.api.clone();
        match target {
            DeleteTarget::Category(category) => self.spawn(async move {
                TaskResult::Saved {
                    notice: "Category deleted.",
                    reload: Reload::Categories,
                    result: api.delete_category(&category).await,
                }
            }),
            DeleteTarget::Warehouse(warehouse) => self.spawn(async move {
                TaskResult::Saved {
                    notice: "Warehouse deleted.",
                    reload: Reload::Warehouses,
                    result: api.delete_warehouse(&warehouse).await,
                }
            }),
            DeleteTarget::User(user) => self.spawn(async move {
                TaskResult::Saved {
                    notice: "User deleted.",
                    reload: Reload::Users,
                    result: api.delete_user(user.id).await,
                }
            }),
        }
    }

    // =========================================================================
    // Stock Out
    // =========================================================================

    /// Pick the highlighted product and load its warehouses.
    pub fn select_stock_product(&mut self) {
        let Some(product_id) = self.picker_products.get(self.picker_selection).map(|p| p.id) else {
            return;
        };
        self.stock_draft.select_product(Some(product_id));
        self.stock_row_selection = 0;
        self.stock_focus = StockFocus::Quantities;
        self.fetch_product_warehouses(product_id);
    }

    pub fn stock_detail_value_mut(&mut self) -> &mut String {
        match self.stock_detail_field {
            0 => &mut self.stock_draft.transaction_date,
            1 => &mut self.stock_draft.reference_no,
            _ => &mut self.stock_draft.remarks,
        }
    }

    /// Append a typed digit to the highlighted warehouse row.
    pub fn type_stock_quantity(&mut self, c: char) {
        let Some(row) = self.stock_draft.rows.get(self.stock_row_selection) else {
            return;
        };
        let id = row.warehouse.warehouse_id;
        let value = format!("{}{}", row.quantity_out, c);
        self.stock_draft.set_quantity(id, &value);
    }

    pub fn erase_stock_quantity(&mut self) {
        let Some(row) = self.stock_draft.rows.get(self.stock_row_selection) else {
            return;
        };
        let id = row.warehouse.warehouse_id;
        let mut value = row.quantity_out.clone();
        value.pop();
        self.stock_draft.set_quantity(id, &value);
    }

    pub fn submit_stock_out(&mut self) {
        if self.stock_submitting {
            return;
        }
        let request = match self.stock_draft.build_request(Local::now().date_naive()) {
            Ok(request) => request,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };
        self.stock_submitting = true;
        let api = self.api.clone();
        let product_id = request.product_id;
        self.spawn(async move {
            TaskResult::StockOutRecorded(product_id, api.record_stock_out(&request).await)
        });
    }
}

/// Turn a filled-in editor into the request to send.
fn build_submission(
    kind: FormKind,
    form: &Form,
    categories: &[Category],
    api: ApiClient,
) -> std::result::Result<impl Future<Output = TaskResult> + Send + 'static, FormError> {
    enum Prepared {
        Product(NewProduct),
        Upload(PathBuf),
        Category(Option<i64>, CategoryInput),
        Warehouse(Option<i64>, WarehouseInput),
        NewUser(NewUser),
        EditUser(i64, UserUpdate),
    }

    let prepared = match kind {
        FormKind::NewProduct => Prepared::Product(product_from_form(form, categories)?),
        FormKind::UploadProducts => {
            let path = PathBuf::from(form.value(0).trim());
            upload_mime(&path)?;
            Prepared::Upload(path)
        }
        FormKind::NewCategory => Prepared::Category(None, CategoryInput::new(form.value(0))?),
        FormKind::EditCategory(id) => {
            Prepared::Category(Some(id), CategoryInput::new(form.value(0))?)
        }
        FormKind::NewWarehouse => {
            Prepared::Warehouse(None, WarehouseInput::new(form.value(0), form.value(1))?)
        }
        FormKind::EditWarehouse(id) => {
            Prepared::Warehouse(Some(id), WarehouseInput::new(form.value(0), form.value(1))?)
        }
        FormKind::NewUser => {
            Prepared::NewUser(NewUser::new(form.value(0), form.value(1), form.value(2))?)
        }
        FormKind::EditUser(id) => {
            Prepared::EditUser(id, UserUpdate::new(form.value(0), form.value(1), form.value(2))?)
        }
    };

    Ok(async move {
        let (notice, reload, result) = match prepared {
            Prepared::Product(product) => {
                ("Product added.", Reload::Products, api.add_product(&product).await)
            }
            Prepared::Upload(path) => (
                "Products uploaded successfully",
                Reload::Products,
                api.upload_products(&path).await,
            ),
            Prepared::Category(None, input) => {
                ("Category created.", Reload::Categories, api.create_category(&input).await)
            }
            Prepared::Category(Some(id), input) => (
                "Category updated.",
                Reload::Categories,
                api.update_category(id, &input).await,
            ),
            Prepared::Warehouse(None, input) => {
                ("Warehouse created.", Reload::Warehouses, api.create_warehouse(&input).await)
            }
            Prepared::Warehouse(Some(id), input) => (
                "Warehouse updated.",
                Reload::Warehouses,
                api.update_warehouse(id, &input).await,
            ),
            Prepared::NewUser(user) => ("User created.", Reload::Users, api.create_user(&user).await),
            Prepared::EditUser(id, update) => {
                ("User updated.", Reload::Users, api.update_user(id, &update).await)
            }
        };
        TaskResult::Saved {
            notice,
            reload,
            result,
        }
    })
}

/// Build a product from the add-product form. The category is typed by
/// name and matched against the loaded categories.
fn product_from_form(form: &Form, categories: &[Category]) -> std::result::Result<NewProduct, FormError> {
    let mut product = NewProduct::new(form.value(0))?;
    let text = |i: usize| Some(form.value(i).trim().to_string()).filter(|v| !v.is_empty());

    product.code = text(1);
    product.brand = text(2);
    product.description = text(3);
    if let Some(name) = text(4) {
        let category = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&name))
            .ok_or(FormError::Required("Known category"))?;
        product.category_id = Some(category.id);
    }
    if let Some(cost) = text(5) {
        product.cost = Some(cost.parse().map_err(|_| FormError::Required("Numeric cost"))?);
    }
    if let Some(date) = text(6) {
        chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| FormError::InvalidDate(date.clone()))?;
        product.grn_date = Some(date);
    }
    product.remarks = text(7);
    Ok(product)
}

/// Message for a failed sign-in.
pub fn login_error_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::BadRequest(message)) if !message.is_empty() => message.clone(),
        Some(ApiError::BadRequest(_)) => "Invalid email or password.".to_string(),
        Some(ApiError::ServerError(_)) => "Server error. Please try again later.".to_string(),
        Some(ApiError::Rejected(message)) => message.clone(),
        _ => "Login failed. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Tab Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_next() {
        assert_eq!(Tab::Dashboard.next(), Tab::Products);
        assert_eq!(Tab::Products.next(), Tab::Inventory);
        assert_eq!(Tab::Inventory.next(), Tab::StockOut);
        assert_eq!(Tab::StockOut.next(), Tab::Users);
        assert_eq!(Tab::Users.next(), Tab::Reports);
        assert_eq!(Tab::Reports.next(), Tab::Dashboard); // Wraps around
    }

    #[test]
    fn test_tab_prev() {
        assert_eq!(Tab::Dashboard.prev(), Tab::Reports); // Wraps around
        for tab in Tab::ALL {
            assert_eq!(tab.next().prev(), tab);
        }
    }

    #[test]
    fn test_tab_routes() {
        for tab in Tab::ALL {
            assert!(tab.route().is_protected());
            assert_eq!(Tab::from_route(tab.route()), Some(tab));
        }
        assert_eq!(Tab::from_route(Route::Categories), Some(Tab::Inventory));
        assert_eq!(Tab::from_route(Route::Login), None);
    }

    // -------------------------------------------------------------------------
    // Form Submission Tests
    // -------------------------------------------------------------------------

    fn categories() -> Vec<Category> {
        vec![Category {
            id: 4,
            name: "Tools".to_string(),
        }]
    }

    fn product_form(values: [&str; 8]) -> Form {
        let mut form = Form::new("Add Product", "Save");
        for (i, label) in ["Name", "Code", "Brand", "Description", "Category", "Cost", "GRN Date", "Remarks"]
            .into_iter()
            .enumerate()
        {
            form = form.field(label, values[i]);
        }
        form
    }

    #[test]
    fn test_product_from_form() {
        let form = product_form(["Hammer", "HM-1", "", "", "tools", "1450.5", "2024-03-01", ""]);
        let product = product_from_form(&form, &categories()).unwrap();
        assert_eq!(product.name, "Hammer");
        assert_eq!(product.code.as_deref(), Some("HM-1"));
        assert_eq!(product.brand, None);
        assert_eq!(product.category_id, Some(4));
        assert_eq!(product.cost, Some(1450.5));
        assert_eq!(product.grn_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_product_from_form_rejections() {
        let form = product_form(["", "", "", "", "", "", "", ""]);
        assert_eq!(
            product_from_form(&form, &categories()).unwrap_err(),
            FormError::Required("Name")
        );
        let form = product_form(["Hammer", "", "", "", "Paint", "", "", ""]);
        assert!(product_from_form(&form, &categories()).is_err());
        let form = product_form(["Hammer", "", "", "", "", "abc", "", ""]);
        assert!(product_from_form(&form, &categories()).is_err());
        let form = product_form(["Hammer", "", "", "", "", "", "01/03/2024", ""]);
        assert_eq!(
            product_from_form(&form, &categories()).unwrap_err(),
            FormError::InvalidDate("01/03/2024".to_string())
        );
    }

    #[test]
    fn test_delete_prompts() {
        let user = User {
            id: 1,
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            role: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(
            DeleteTarget::User(user).prompt(),
            "Delete user \"Jane Doe\"? This cannot be undone."
        );
        assert_eq!(
            DeleteTarget::Category(categories()[0].clone()).prompt(),
            "Delete category \"Tools\"?"
        );
    }

    #[test]
    fn test_login_error_message() {
        let bad: anyhow::Error = ApiError::BadRequest("Invalid email or password.".to_string()).into();
        assert_eq!(login_error_message(&bad), "Invalid email or password.");
        let server: anyhow::Error = ApiError::ServerError("boom".to_string()).into();
        assert_eq!(login_error_message(&server), "Server error. Please try again later.");
        let other = anyhow::anyhow!("connection refused");
        assert_eq!(login_error_message(&other), "Login failed. Please try again.");
    }

    // -------------------------------------------------------------------------
    // Session Wiring Tests
    // -------------------------------------------------------------------------

    fn app() -> App {
        App::new(Config::default(), &SharedStorage::in_memory()).unwrap()
    }

    fn sign_in(app: &App) {
        let in_an_hour = Local::now().timestamp_millis() + 3_600_000;
        app.session.set_auth_token("opaque-token", Some(in_an_hour));
        app.session.set_user_data(&UserProfile {
            full_name: Some("Clerk".to_string()),
            ..Default::default()
        });
    }

    #[tokio::test]
    async fn test_root_without_session_shows_login() {
        let mut app = app();
        app.open(Route::Root);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_tab_switch_requires_session() {
        let mut app = app();
        app.switch_tab(Tab::Users);
        assert_eq!(app.state, AppState::LoggingIn);

        sign_in(&app);
        app.switch_tab(Tab::Users);
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.current_tab, Tab::Users);
        assert_eq!(app.profile.as_ref().and_then(|p| p.full_name.as_deref()), Some("Clerk"));
    }

    #[tokio::test]
    async fn test_logout_clears_loaded_data() {
        let mut app = app();
        sign_in(&app);
        app.open(Route::Root);
        app.products_search = "hammer".to_string();
        app.warehouses.push(Warehouse {
            id: 1,
            name: "Main".to_string(),
            location: None,
        });

        app.logout();
        app.process_session_events();

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.warehouses.is_empty());
        assert!(app.products_search.is_empty());
        assert!(!app.session.is_authenticated());
        assert_eq!(app.status_message.as_deref(), Some("Signed out."));
    }

    #[tokio::test]
    async fn test_unauthorized_response_ends_session() {
        let mut app = app();
        sign_in(&app);
        app.open(Route::Dashboard);

        app.handle_error(ApiError::Unauthorized.into());
        app.process_session_events();

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(!app.session.is_authenticated());
        assert_eq!(app.status_message.as_deref(), Some(SESSION_EXPIRED_MESSAGE));
    }

    #[tokio::test]
    async fn test_stale_results_are_dropped() {
        let mut app = app();
        sign_in(&app);
        let stale = app.generation;
        app.logout();
        app.process_session_events();
        assert_ne!(app.generation, stale);

        app.task_tx
            .try_send(TaskMessage {
                generation: stale,
                result: TaskResult::Warehouses(Ok(vec![Warehouse {
                    id: 9,
                    name: "Old".to_string(),
                    location: None,
                }])),
            })
            .unwrap();
        app.check_background_tasks();
        assert!(app.warehouses.is_empty());
    }

    #[tokio::test]
    async fn test_stock_quantity_typing() {
        let mut app = app();
        app.stock_draft.select_product(Some(3));
        app.stock_draft.set_warehouses(vec![ProductWarehouseStock {
            warehouse_id: 7,
            warehouse_name: "Main".to_string(),
            location: None,
            available_quantity: Some(20),
        }]);
        app.type_stock_quantity('1');
        app.type_stock_quantity('x');
        app.type_stock_quantity('2');
        assert_eq!(app.stock_draft.rows[0].quantity_out, "12");
        app.erase_stock_quantity();
        assert_eq!(app.stock_draft.rows[0].quantity_out, "1");
    }
}
