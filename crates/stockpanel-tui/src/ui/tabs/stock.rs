use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use stockpanel_core::utils::EMPTY;

use crate::app::{App, StockFocus, STOCK_DETAIL_FIELDS};
use crate::ui::styles;
use crate::ui::widgets::{panel, placeholder};

/// Render the Stock Out tab - product picker, warehouse quantities, details
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    render_product_picker(frame, app, chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Warehouse rows
            Constraint::Length(5), // Details
            Constraint::Length(3), // Totals
        ])
        .split(chunks[1]);

    render_quantities(frame, app, right[0]);
    render_details(frame, app, right[1]);
    render_totals(frame, app, right[2]);
}

fn render_product_picker(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.stock_focus == StockFocus::Products;
    let block = panel(" Select Product ", focused);

    if app.picker_products.is_empty() {
        frame.render_widget(Paragraph::new(placeholder("No products")).block(block), area);
        return;
    }

    let items: Vec<ListItem> = app
        .picker_products
        .iter()
        .map(|p| {
            let chosen = app.stock_draft.product_id == Some(p.id);
            let marker = if chosen { "✓ " } else { "  " };
            let style = if chosen {
                styles::success_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(format!("{}{}", marker, p.picker_label())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(styles::selected_style());
    let mut state = ListState::default();
    state.select(Some(app.picker_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_quantities(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.stock_focus == StockFocus::Quantities;
    let block = panel(" Warehouse Stock ", focused);

    if app.stock_draft.product_id.is_none() {
        let text = Paragraph::new(placeholder("Pick a product to see its warehouses")).block(block);
        frame.render_widget(text, area);
        return;
    }
    if app.stock_draft.rows.is_empty() {
        let text = Paragraph::new(placeholder("This product is not stocked in any warehouse"))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let header = Row::new(["Warehouse", "Location", "Available", "Qty Out"])
        .style(styles::title_style());

    let rows: Vec<Row> = app
        .stock_draft
        .rows
        .iter()
        .map(|row| {
            let out_style = if row.exceeds_available() {
                styles::error_style()
            } else {
                styles::highlight_style()
            };
            Row::new(vec![
                Cell::from(row.warehouse.warehouse_name.clone()),
                Cell::from(
                    row.warehouse
                        .location
                        .clone()
                        .unwrap_or_else(|| EMPTY.to_string()),
                ),
                Cell::from(format!("{:>9}", row.warehouse.available())),
                Cell::from(format!("{:>7}", row.quantity_out)).style(out_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(10),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if focused {
        state.select(Some(app.stock_row_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.stock_focus == StockFocus::Details;
    let draft = &app.stock_draft;
    let values = [&draft.transaction_date, &draft.reference_no, &draft.remarks];

    let lines: Vec<Line> = STOCK_DETAIL_FIELDS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (label, value))| {
            let active = focused && app.stock_detail_field == i;
            let style = if active {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let cursor = if active { "▌" } else { "" };
            Line::from(vec![
                Span::styled(format!(" {:>16}: ", label), styles::muted_style()),
                Span::styled(format!("{}{}", value, cursor), style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(panel(" Details ", focused)), area);
}

fn render_totals(frame: &mut Frame, app: &App, area: Rect) {
    let action = if app.stock_submitting {
        Span::styled("Submitting...", styles::muted_style())
    } else {
        Span::styled("[s] Submit Stock Out", styles::help_key_style())
    };
    let line = Line::from(vec![
        Span::styled(" Total Quantity Out: ", styles::muted_style()),
        Span::styled(
            format!("{:<8}", app.stock_draft.total_quantity_out()),
            styles::title_style(),
        ),
        action,
    ]);
    frame.render_widget(Paragraph::new(line).block(panel("", false)), area);
}
