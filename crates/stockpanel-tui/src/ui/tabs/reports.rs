use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use stockpanel_core::models::ReportKind;

use crate::app::App;
use crate::ui::styles;
use crate::ui::widgets::{panel, placeholder};

/// Render the Reports tab - report picker and the selected report's rows
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(area);

    render_report_picker(frame, app, chunks[0]);
    render_report_table(frame, app, chunks[1]);
}

fn render_report_picker(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = ReportKind::ALL
        .iter()
        .map(|kind| ListItem::new(kind.title()).style(styles::list_item_style()))
        .collect();

    let list = List::new(items)
        .block(panel(" Reports ", true))
        .highlight_style(styles::selected_style());
    let mut state = ListState::default();
    state.select(Some(app.report_kind_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_report_table(frame: &mut Frame, app: &App, area: Rect) {
    let kind = app.selected_report_kind();
    let mut title = format!(" {} ", kind.title());
    if app.exporting_pdf {
        title.push_str("- saving PDF... ");
    }

    let Some(ref report) = app.report else {
        frame.render_widget(Paragraph::new(placeholder("Loading...")).block(panel(title, false)), area);
        return;
    };
    if report.is_empty() {
        let text = Paragraph::new(placeholder("No data found for this report."));
        frame.render_widget(text.block(panel(title, false)), area);
        return;
    }

    let columns = report.kind().columns();
    let header = Row::new(columns.iter().map(|c| c.label)).style(styles::title_style());
    let rows: Vec<Row> = report.cells().into_iter().map(Row::new).collect();
    let widths: Vec<Constraint> = columns
        .iter()
        .map(|c| match c.key {
            "name" | "warehouse_name" | "remarks" => Constraint::Fill(3),
            "total_quantity" => Constraint::Length(8),
            _ => Constraint::Fill(1),
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(panel(format!("{}({} rows) ", title, report.len()), false))
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.report_selection));
    frame.render_stateful_widget(table, area, &mut state);
}
