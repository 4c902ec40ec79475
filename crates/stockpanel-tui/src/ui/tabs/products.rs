use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use stockpanel_core::models::Product;
use stockpanel_core::utils::{format_currency, format_report_date, truncate_text, EMPTY, TABLE_TEXT_LIMIT};

use crate::app::{App, AppState};
use crate::ui::styles;
use crate::ui::widgets::{detail_line, pager_line, panel, placeholder};

/// Suggestions shown under the search box.
const MAX_SUGGESTIONS: usize = 8;

/// Stock at or below this is drawn in amber.
const LOW_STOCK_HIGHLIGHT: i64 = 5;

/// Render the Products tab - paged table with a detail panel
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_product_table(frame, app, chunks[0]);
    render_product_detail(frame, app, chunks[1]);

    if app.state == AppState::Searching && !app.suggestions.is_empty() {
        render_suggestions(frame, app, chunks[0]);
    }
}

fn render_product_table(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let header = Row::new([
        "Product Name",
        "Code",
        "Brand",
        "Category",
        "Cost",
        "GRN Date",
        "Stock",
        "Remarks",
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .products
        .products
        .iter()
        .map(|product| {
            let stock = product.stock();
            Row::new(vec![
                Cell::from(truncate_text(Some(&product.name), TABLE_TEXT_LIMIT)),
                Cell::from(or_empty(product.code.as_deref())),
                Cell::from(or_empty(product.brand.as_deref())),
                Cell::from(product.category_name().to_string()),
                Cell::from(format_currency(product.cost.as_deref())),
                Cell::from(format_report_date(product.grn_date.as_deref())),
                Cell::from(format!("{:>5}", stock)).style(styles::stock_style(stock, LOW_STOCK_HIGHLIGHT)),
                Cell::from(truncate_text(product.remarks.as_deref(), TABLE_TEXT_LIMIT)),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Fill(2),
    ];

    let mut title = format!(" Products ({}) ", app.products.pagination.total);
    if !app.products_search.is_empty() {
        title = format!(" Products matching \"{}\" ({}) ", app.products_search, app.products.pagination.total);
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(panel(title, true))
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !app.products.products.is_empty() {
        state.select(Some(app.product_selection));
    }
    frame.render_stateful_widget(table, chunks[0], &mut state);

    let pager = pager_line(app.products_page, app.products.pagination.total_pages);
    frame.render_widget(Paragraph::new(pager), chunks[1]);
}

fn render_product_detail(frame: &mut Frame, app: &App, area: Rect) {
    let selected = app.products.products.get(app.product_selection);
    // Prefer the fetched record, which carries per-warehouse stock.
    let product = match (selected, app.product_detail.as_ref()) {
        (Some(row), Some(detail)) if detail.id == row.id => Some(detail),
        (row, _) => row,
    };

    let Some(product) = product else {
        let text = Paragraph::new(placeholder("No products found")).block(panel(" Product ", false));
        frame.render_widget(text, area);
        return;
    };

    let paragraph = Paragraph::new(detail_lines(product))
        .block(panel(format!(" {} ", product.name), false))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn detail_lines(product: &Product) -> Vec<Line<'static>> {
    let mut lines = vec![
        detail_line("Code", or_empty(product.code.as_deref())),
        detail_line("Brand", or_empty(product.brand.as_deref())),
        detail_line("Category", product.category_name().to_string()),
        detail_line("Cost", format_currency(product.cost.as_deref())),
        detail_line("GRN Date", format_report_date(product.grn_date.as_deref())),
        detail_line("Total Stock", product.stock().to_string()),
        detail_line("Description", or_empty(product.description.as_deref())),
        detail_line("Remarks", or_empty(product.remarks.as_deref())),
        Line::from(""),
        Line::from(Span::styled("Stock by Warehouse", styles::title_style())),
    ];

    if product.stock_by_warehouse.is_empty() {
        lines.push(placeholder("  Press Enter to load warehouse stock"));
    }
    for entry in &product.stock_by_warehouse {
        let quantity = entry
            .quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| EMPTY.to_string());
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<24}", entry.warehouse), styles::list_item_style()),
            Span::styled(quantity, styles::highlight_style()),
        ]));
    }
    lines
}

fn render_suggestions(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .suggestions
        .iter()
        .take(MAX_SUGGESTIONS)
        .map(|p| ListItem::new(p.picker_label()).style(styles::list_item_style()))
        .collect();

    let height = items.len() as u16 + 2;
    let popup = Rect::new(
        area.x + 2,
        area.y + 1,
        area.width.saturating_sub(4).min(50),
        height.min(area.height.saturating_sub(1)),
    );
    frame.render_widget(Clear, popup);
    let list = List::new(items).block(panel(" Suggestions [Tab] to use first ", true));
    frame.render_widget(list, popup);
}

fn or_empty(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => EMPTY.to_string(),
    }
}
