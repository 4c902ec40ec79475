use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use stockpanel_core::utils::{format_datetime, EMPTY};

use crate::app::App;
use crate::ui::styles;
use crate::ui::widgets::{detail_line, pager_line, panel, placeholder};

/// Render the Users tab - paged table, with a detail panel when opened
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let constraints = if app.user_detail_open {
        [Constraint::Percentage(65), Constraint::Percentage(35)]
    } else {
        [Constraint::Percentage(100), Constraint::Percentage(0)]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    render_user_table(frame, app, chunks[0]);
    if app.user_detail_open {
        render_user_detail(frame, app, chunks[1]);
    }
}

fn render_user_table(frame: &mut Frame, app: &App, area: Rect) {
    let total = app.users.meta.total.unwrap_or(app.users.data.len() as u64);
    let title = if app.users_query.is_empty() {
        format!(" Users ({}) ", total)
    } else {
        format!(" Users matching \"{}\" ({}) ", app.users_query, total)
    };
    let block = panel(title, true);

    if app.users.data.is_empty() {
        frame.render_widget(Paragraph::new(placeholder("No users found")).block(block), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let header = Row::new(["Full Name", "Email", "Role", "Created"]).style(styles::title_style());
    let rows: Vec<Row> = app
        .users
        .data
        .iter()
        .map(|u| {
            Row::new(vec![
                Cell::from(u.full_name.clone()),
                Cell::from(u.email.clone()),
                Cell::from(u.role.clone().unwrap_or_else(|| EMPTY.to_string())),
                Cell::from(format_datetime(u.created_at.as_deref())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Length(17),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.user_selection));
    frame.render_stateful_widget(table, chunks[0], &mut state);

    let pager = pager_line(app.users_page, app.users.meta.pages);
    frame.render_widget(Paragraph::new(pager), chunks[1]);
}

fn render_user_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(user) = app.users.data.get(app.user_selection) else {
        return;
    };
    let lines = vec![
        detail_line("Email", user.email.clone()),
        detail_line("Role", user.role.clone().unwrap_or_else(|| EMPTY.to_string())),
        detail_line("Created", format_datetime(user.created_at.as_deref())),
        detail_line("Updated", format_datetime(user.updated_at.as_deref())),
    ];
    let paragraph = Paragraph::new(lines).block(panel(format!(" {} ", user.full_name), false));
    frame.render_widget(paragraph, area);
}
