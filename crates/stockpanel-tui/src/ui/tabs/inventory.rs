use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use stockpanel_core::utils::EMPTY;

use crate::app::{App, InventoryPane};
use crate::ui::styles;
use crate::ui::widgets::{pager_line, panel, placeholder};

/// Render the Inventory tab - categories and warehouses side by side
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_categories(frame, app, chunks[0]);
    render_warehouses(frame, app, chunks[1]);
}

fn render_categories(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.inventory_pane == InventoryPane::Categories;
    let block = panel(
        format!(" Categories ({}) ", app.categories.pagination.total),
        focused,
    );

    if app.categories.categories.is_empty() {
        frame.render_widget(Paragraph::new(placeholder("No categories yet")).block(block), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let header = Row::new(["ID", "Category Name"]).style(styles::title_style());
    let rows: Vec<Row> = app
        .categories
        .categories
        .iter()
        .map(|c| Row::new(vec![Cell::from(c.id.to_string()), Cell::from(c.name.clone())]))
        .collect();

    let table = Table::new(rows, [Constraint::Length(6), Constraint::Fill(1)])
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if focused {
        state.select(Some(app.category_selection));
    }
    frame.render_stateful_widget(table, chunks[0], &mut state);

    let pager = pager_line(app.categories_page, app.categories.pagination.total_pages);
    frame.render_widget(Paragraph::new(pager), chunks[1]);
}

fn render_warehouses(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.inventory_pane == InventoryPane::Warehouses;
    let block = panel(format!(" Warehouses ({}) ", app.warehouses.len()), focused);

    if app.warehouses.is_empty() {
        frame.render_widget(Paragraph::new(placeholder("No warehouses yet")).block(block), area);
        return;
    }

    let header = Row::new(["ID", "Warehouse Name", "Location"]).style(styles::title_style());
    let rows: Vec<Row> = app
        .warehouses
        .iter()
        .map(|w| {
            Row::new(vec![
                Cell::from(w.id.to_string()),
                Cell::from(w.name.clone()),
                Cell::from(w.location.clone().unwrap_or_else(|| EMPTY.to_string())),
            ])
        })
        .collect();

    let widths = [Constraint::Length(6), Constraint::Fill(1), Constraint::Fill(1)];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if focused {
        state.select(Some(app.warehouse_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
