use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use stockpanel_core::utils::{format_currency, truncate_text, EMPTY, TABLE_TEXT_LIMIT};

use crate::app::App;
use crate::ui::styles;
use crate::ui::widgets::{panel, placeholder};

/// Quantity at or below which a low-stock row is drawn in amber.
const LOW_STOCK_HIGHLIGHT: i64 = 5;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    render_stat_cards(frame, app, chunks[0]);
    render_low_stock(frame, app, chunks[1]);
}

fn render_stat_cards(frame: &mut Frame, app: &App, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let stats = app.dashboard.as_ref().map(|d| d.stats).unwrap_or_default();
    for ((title, value), card) in stats.cards().into_iter().zip(cards.iter()) {
        let value = value
            .map(|v| v.to_string())
            .unwrap_or_else(|| EMPTY.to_string());
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!(" {}", value), styles::title_style())),
        ];
        let paragraph = Paragraph::new(lines).block(panel(format!(" {} ", title), false));
        frame.render_widget(paragraph, *card);
    }
}

fn render_low_stock(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Low Stock Products ", true);

    let items = match app.dashboard {
        Some(ref overview) if !overview.low_stock.is_empty() => &overview.low_stock,
        Some(_) => {
            let text = Paragraph::new(placeholder("No low-stock products")).block(block);
            frame.render_widget(text, area);
            return;
        }
        None => {
            let text = Paragraph::new(placeholder("Loading...")).block(block);
            frame.render_widget(text, area);
            return;
        }
    };

    let header = Row::new(["Product Name", "Code", "Brand", "Cost (Rs.)", "Qty"])
        .style(styles::title_style())
        .height(1);

    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            let qty = item.total_quantity.unwrap_or(0);
            Row::new(vec![
                Cell::from(truncate_text(Some(&item.name), TABLE_TEXT_LIMIT)),
                Cell::from(item.code.clone().unwrap_or_else(|| EMPTY.to_string())),
                Cell::from(item.brand.clone().unwrap_or_else(|| EMPTY.to_string())),
                Cell::from(format_currency(item.cost.as_deref())),
                Cell::from(format!("{:>5}", qty)).style(styles::stock_style(qty, LOW_STOCK_HIGHLIGHT)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(14),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}
