//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use stockpanel_core::auth::Route;
use stockpanel_core::models::ReportKind;

use crate::app::{
    App, AppState, DeleteTarget, FormKind, InventoryPane, StockFocus, Tab, PAGE_SCROLL_SIZE,
    STOCK_DETAIL_FIELDS,
};
use crate::form::{can_add_char, Form, MAX_FIELD_LENGTH};

/// What a key did to a form.
enum FormAction {
    Edited,
    Submit,
    Cancel,
}

/// Shared editing keys for every form overlay.
fn edit_form(form: &mut Form, key: KeyEvent) -> FormAction {
    match key.code {
        KeyCode::Esc => return FormAction::Cancel,
        KeyCode::Down | KeyCode::Tab => form.focus_next(),
        KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
        KeyCode::Enter => {
            if form.on_submit() {
                return FormAction::Submit;
            }
            form.focus_next();
        }
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => {
            if form.on_submit() {
                // Typing on the button goes back to the first field
                form.focus = 0;
            }
            form.push_char(c);
        }
        _ => {}
    }
    FormAction::Edited
}

/// Move a list selection by `delta`, clamped to `len`.
fn step(selection: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    selection.saturating_add_signed(delta).min(len - 1)
}

fn scroll_delta(code: KeyCode) -> Option<isize> {
    match code {
        KeyCode::Up => Some(-1),
        KeyCode::Down => Some(1),
        KeyCode::PageUp => Some(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => Some(PAGE_SCROLL_SIZE as isize),
        KeyCode::Home => Some(isize::MIN / 2),
        KeyCode::End => Some(isize::MAX / 2),
        _ => None,
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::Quitting => return Ok(true),
        AppState::LoggingIn => return Ok(handle_login_input(app, key)),
        AppState::Registering => {
            handle_register_input(app, key);
            return Ok(false);
        }
        AppState::EditingForm => {
            handle_form_input(app, key);
            return Ok(false);
        }
        AppState::Searching => {
            handle_search_input(app, key);
            return Ok(false);
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.execute_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.pending_delete = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Normal => {}
    }

    // Typing into the stock-out quantities or details takes every key
    if app.current_tab == Tab::StockOut && app.stock_focus != StockFocus::Products {
        handle_stock_entry(app, key);
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            app.switch_tab(Tab::ALL[index]);
        }
        KeyCode::Left => app.switch_tab(app.current_tab.prev()),
        KeyCode::Right => app.switch_tab(app.current_tab.next()),
        KeyCode::Char('u') => {
            app.status_message = None;
            app.refresh_current_tab();
        }
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('/') if matches!(app.current_tab, Tab::Products | Tab::Users) => {
            app.search_query = match app.current_tab {
                Tab::Users => app.users_query.clone(),
                _ => app.products_search.clone(),
            };
            app.suggestions.clear();
            app.state = AppState::Searching;
        }
        KeyCode::Esc => app.status_message = None,
        _ => match app.current_tab {
            Tab::Dashboard => {}
            Tab::Products => handle_products_input(app, key),
            Tab::Inventory => handle_inventory_input(app, key),
            Tab::StockOut => handle_stock_picker_input(app, key),
            Tab::Users => handle_users_input(app, key),
            Tab::Reports => handle_reports_input(app, key),
        },
    }

    Ok(false)
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.open(Route::Register);
        return false;
    }
    match edit_form(&mut app.login_form, key) {
        FormAction::Cancel => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            true
        }
        FormAction::Submit => {
            app.submit_login();
            false
        }
        FormAction::Edited => false,
    }
}

fn handle_register_input(app: &mut App, key: KeyEvent) {
    match edit_form(&mut app.register_form, key) {
        FormAction::Cancel => app.open(Route::Login),
        FormAction::Submit => app.submit_register(),
        FormAction::Edited => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    let Some((_, ref mut form)) = app.edit_form else {
        app.state = AppState::Normal;
        return;
    };
    if form.submitting {
        return;
    }
    match edit_form(form, key) {
        FormAction::Cancel => app.close_form(),
        FormAction::Submit => app.submit_form(),
        FormAction::Edited => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    let products = app.current_tab == Tab::Products;
    match key.code {
        KeyCode::Esc => {
            // Esc drops the active filter as well
            app.state = AppState::Normal;
            app.search_query.clear();
            let filtered = if products {
                !app.products_search.is_empty()
            } else {
                !app.users_query.is_empty()
            };
            if filtered {
                app.apply_search();
            }
            app.suggestions.clear();
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            app.apply_search();
        }
        KeyCode::Tab if products => {
            if let Some(first) = app.suggestions.first() {
                app.search_query = first.name.clone();
                app.state = AppState::Normal;
                app.apply_search();
            }
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            if products {
                app.fetch_suggestions();
            }
        }
        KeyCode::Char(c) => {
            if can_add_char(app.search_query.chars().count(), MAX_FIELD_LENGTH, c) {
                app.search_query.push(c);
                if products {
                    app.fetch_suggestions();
                }
            }
        }
        _ => {}
    }
}

fn handle_products_input(app: &mut App, key: KeyEvent) {
    if let Some(delta) = scroll_delta(key.code) {
        let next = step(app.product_selection, app.products.products.len(), delta);
        if next != app.product_selection {
            app.product_selection = next;
            app.product_detail = None;
        }
        return;
    }
    match key.code {
        KeyCode::Enter => app.fetch_product_detail(),
        KeyCode::Char('n') => app.go_to_products_page(app.products_page + 1),
        KeyCode::Char('p') => app.go_to_products_page(app.products_page.saturating_sub(1)),
        KeyCode::Char('a') => app.open_form(FormKind::NewProduct),
        KeyCode::Char('i') => app.open_form(FormKind::UploadProducts),
        _ => {}
    }
}

fn handle_inventory_input(app: &mut App, key: KeyEvent) {
    if let Some(delta) = scroll_delta(key.code) {
        match app.inventory_pane {
            InventoryPane::Categories => {
                app.category_selection =
                    step(app.category_selection, app.categories.categories.len(), delta);
            }
            InventoryPane::Warehouses => {
                app.warehouse_selection =
                    step(app.warehouse_selection, app.warehouses.len(), delta);
            }
        }
        return;
    }

    match (app.inventory_pane, key.code) {
        (_, KeyCode::Tab) => {
            app.inventory_pane = match app.inventory_pane {
                InventoryPane::Categories => InventoryPane::Warehouses,
                InventoryPane::Warehouses => InventoryPane::Categories,
            };
        }
        (InventoryPane::Categories, KeyCode::Char('n')) => {
            app.go_to_categories_page(app.categories_page + 1);
        }
        (InventoryPane::Categories, KeyCode::Char('p')) => {
            app.go_to_categories_page(app.categories_page.saturating_sub(1));
        }
        (InventoryPane::Categories, KeyCode::Char('a')) => app.open_form(FormKind::NewCategory),
        (InventoryPane::Warehouses, KeyCode::Char('a')) => app.open_form(FormKind::NewWarehouse),
        (InventoryPane::Categories, KeyCode::Char('e')) => {
            if let Some(category) = app.categories.categories.get(app.category_selection) {
                app.open_form(FormKind::EditCategory(category.id));
            }
        }
        (InventoryPane::Warehouses, KeyCode::Char('e')) => {
            if let Some(warehouse) = app.warehouses.get(app.warehouse_selection) {
                app.open_form(FormKind::EditWarehouse(warehouse.id));
            }
        }
        (InventoryPane::Categories, KeyCode::Char('d')) => {
            if let Some(category) = app.categories.categories.get(app.category_selection).cloned() {
                app.confirm_delete(DeleteTarget::Category(category));
            }
        }
        (InventoryPane::Warehouses, KeyCode::Char('d')) => {
            if let Some(warehouse) = app.warehouses.get(app.warehouse_selection).cloned() {
                app.confirm_delete(DeleteTarget::Warehouse(warehouse));
            }
        }
        _ => {}
    }
}

fn handle_users_input(app: &mut App, key: KeyEvent) {
    if let Some(delta) = scroll_delta(key.code) {
        app.user_selection = step(app.user_selection, app.users.data.len(), delta);
        return;
    }
    match key.code {
        KeyCode::Enter => app.user_detail_open = !app.user_detail_open,
        KeyCode::Char('n') => app.go_to_users_page(app.users_page + 1),
        KeyCode::Char('p') => app.go_to_users_page(app.users_page.saturating_sub(1)),
        KeyCode::Char('a') => app.open_form(FormKind::NewUser),
        KeyCode::Char('e') => {
            if let Some(user) = app.users.data.get(app.user_selection) {
                app.open_form(FormKind::EditUser(user.id));
            }
        }
        KeyCode::Char('d') => {
            if let Some(user) = app.users.data.get(app.user_selection).cloned() {
                app.confirm_delete(DeleteTarget::User(user));
            }
        }
        _ => {}
    }
}

fn handle_reports_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Down => {
            let delta = if key.code == KeyCode::Up { -1 } else { 1 };
            let next = step(app.report_kind_selection, ReportKind::ALL.len(), delta);
            if next != app.report_kind_selection {
                app.report_kind_selection = next;
                app.fetch_report();
            }
        }
        KeyCode::PageUp | KeyCode::PageDown => {
            let len = app.report.as_ref().map(|r| r.len()).unwrap_or(0);
            let delta = scroll_delta(key.code).unwrap_or(0);
            app.report_selection = step(app.report_selection, len, delta);
        }
        KeyCode::Enter => app.fetch_report(),
        KeyCode::Char('x') => app.export_report_pdf(),
        _ => {}
    }
}

fn handle_stock_picker_input(app: &mut App, key: KeyEvent) {
    if let Some(delta) = scroll_delta(key.code) {
        app.picker_selection = step(app.picker_selection, app.picker_products.len(), delta);
        return;
    }
    match key.code {
        KeyCode::Enter => app.select_stock_product(),
        KeyCode::Tab if app.stock_draft.product_id.is_some() => {
            app.stock_focus = StockFocus::Quantities;
        }
        KeyCode::Char('s') => app.submit_stock_out(),
        _ => {}
    }
}

/// Keys while the quantities or detail fields have focus.
fn handle_stock_entry(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.stock_focus = StockFocus::Products;
            return;
        }
        KeyCode::Tab => {
            app.stock_focus = match app.stock_focus {
                StockFocus::Quantities => StockFocus::Details,
                _ => StockFocus::Products,
            };
            return;
        }
        KeyCode::BackTab => {
            app.stock_focus = match app.stock_focus {
                StockFocus::Details => StockFocus::Quantities,
                _ => StockFocus::Products,
            };
            return;
        }
        KeyCode::Enter | KeyCode::Char('s') if app.stock_focus == StockFocus::Quantities => {
            app.submit_stock_out();
            return;
        }
        KeyCode::Enter if app.stock_focus == StockFocus::Details => {
            if app.stock_detail_field + 1 < STOCK_DETAIL_FIELDS.len() {
                app.stock_detail_field += 1;
            } else {
                app.submit_stock_out();
            }
            return;
        }
        _ => {}
    }

    match app.stock_focus {
        StockFocus::Quantities => match key.code {
            KeyCode::Up | KeyCode::Down => {
                let delta = if key.code == KeyCode::Up { -1 } else { 1 };
                app.stock_row_selection =
                    step(app.stock_row_selection, app.stock_draft.rows.len(), delta);
            }
            KeyCode::Backspace => app.erase_stock_quantity(),
            KeyCode::Char(c) => app.type_stock_quantity(c),
            _ => {}
        },
        StockFocus::Details => match key.code {
            KeyCode::Up => app.stock_detail_field = app.stock_detail_field.saturating_sub(1),
            KeyCode::Down => {
                app.stock_detail_field = (app.stock_detail_field + 1).min(STOCK_DETAIL_FIELDS.len() - 1);
            }
            KeyCode::Backspace => {
                app.stock_detail_value_mut().pop();
            }
            KeyCode::Char(c) => {
                let value = app.stock_detail_value_mut();
                if can_add_char(value.chars().count(), MAX_FIELD_LENGTH, c) {
                    value.push(c);
                }
            }
            _ => {}
        },
        StockFocus::Products => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_step_clamps() {
        assert_eq!(step(0, 5, -1), 0);
        assert_eq!(step(3, 5, 1), 4);
        assert_eq!(step(4, 5, 1), 4);
        assert_eq!(step(2, 5, isize::MAX / 2), 4);
        assert_eq!(step(2, 5, isize::MIN / 2), 0);
        assert_eq!(step(7, 0, 1), 0);
    }

    #[test]
    fn test_edit_form_cycles_and_submits() {
        let mut form = Form::new("Login", "Login").field("Email", "").secret("Password");
        assert!(matches!(edit_form(&mut form, key(KeyCode::Char('a'))), FormAction::Edited));
        assert_eq!(form.value(0), "a");

        edit_form(&mut form, key(KeyCode::Tab));
        edit_form(&mut form, key(KeyCode::Char('x')));
        assert_eq!(form.value(1), "x");

        // Enter on a field moves on; Enter on the button submits
        assert!(matches!(edit_form(&mut form, key(KeyCode::Enter)), FormAction::Edited));
        assert!(form.on_submit());
        assert!(matches!(edit_form(&mut form, key(KeyCode::Enter)), FormAction::Submit));
        assert!(matches!(edit_form(&mut form, key(KeyCode::Esc)), FormAction::Cancel));
    }

    #[test]
    fn test_typing_on_button_returns_to_first_field() {
        let mut form = Form::new("Category", "Save").field("Name", "");
        form.focus = 1;
        edit_form(&mut form, key(KeyCode::Char('T')));
        assert_eq!(form.focus, 0);
        assert_eq!(form.value(0), "T");
    }
}
