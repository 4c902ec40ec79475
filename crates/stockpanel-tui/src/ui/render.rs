use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, Tab};

use super::styles;
use super::tabs::{dashboard, inventory, products, reports, stock, users};
use super::widgets::{centered_rect_fixed, render_form_modal};

const LOGO: [&str; 3] = [
    "  ╔═╗╔╦╗╔═╗╔═╗╦╔═  ╔═╗╔═╗╔╗╔╔═╗╦  ",
    "  ╚═╗ ║ ║ ║║  ╠╩╗  ╠═╝╠═╣║║║║╣ ║  ",
    "  ╚═╝ ╩ ╚═╝╚═╝╩ ╩  ╩  ╩ ╩╝╚╝╚═╝╩═╝",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    if !matches!(app.state, AppState::LoggingIn | AppState::Registering) {
        render_main_content(frame, app, chunks[2]);
    }
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::Registering => render_register_overlay(frame, app),
        AppState::EditingForm => {
            if let Some((_, ref form)) = app.edit_form {
                render_form_modal(frame, form, 64, &[hint_line("Enter", "next / submit", "Esc", "cancel")]);
            }
        }
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Searching | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  StockPanel";
    let user = match app.profile {
        Some(ref profile) => {
            let role = profile.role.as_deref().unwrap_or("user");
            format!("{} ({})  [L]ogout  [?] Help", profile.display_name(), role)
        }
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + user.chars().count() + 2),
        )),
        Span::styled(user, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        spans.push(Span::styled(label, styles::tab_style(*tab == app.current_tab)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Dashboard => dashboard::render(frame, app, area),
        Tab::Products => products::render(frame, app, area),
        Tab::Inventory => inventory::render(frame, app, area),
        Tab::StockOut => stock::render(frame, app, area),
        Tab::Users => users::render(frame, app, area),
        Tab::Reports => reports::render(frame, app, area),
    }
}

/// Keys that make sense on the current tab.
fn tab_shortcuts(tab: Tab) -> &'static str {
    match tab {
        Tab::Dashboard => "[u]pdate | [q]uit",
        Tab::Products => "[/]search [a]dd [i]mport [Enter]view | [q]uit",
        Tab::Inventory => "[Tab]pane [a]dd [e]dit [d]elete | [q]uit",
        Tab::StockOut => "[Enter]select [Tab]focus [s]ubmit | [q]uit",
        Tab::Users => "[/]search [a]dd [e]dit [d]elete | [q]uit",
        Tab::Reports => "[↑/↓]report [PgUp/PgDn]scroll [x]pdf | [q]uit",
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if app.state == AppState::Searching {
        format!(" Search: {}▌ ", app.search_query)
    } else if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if app.is_loading() {
        " Loading... ".to_string()
    } else {
        String::new()
    };
    let left_style = if app.state == AppState::Searching {
        styles::search_style()
    } else {
        styles::muted_style()
    };

    let right_text = format!(" {} ", tab_shortcuts(app.current_tab));
    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect()
}

fn key_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn hint_line(
    first_key: &'static str,
    first: &'static str,
    second_key: &'static str,
    second: &'static str,
) -> Line<'static> {
    Line::from(vec![
        Span::styled(" Press ", styles::muted_style()),
        Span::styled(first_key, styles::help_key_style()),
        Span::styled(format!(" {}, ", first), styles::muted_style()),
        Span::styled(second_key, styles::help_key_style()),
        Span::styled(format!(" {}", second), styles::muted_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(56, 31, frame.area());
    frame.render_widget(Clear, area);

    let mut help_text = logo_lines();
    help_text.extend([
        Line::from(Span::styled(
            format!("             version {}", env!("CARGO_PKG_VERSION")),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        key_line("1-6", "Switch tabs"),
        key_line("←/→", "Previous/next tab"),
        key_line("↑/↓", "Navigate list"),
        key_line("PgUp/PgDn", "Scroll a page"),
        key_line("n/p", "Next/previous page"),
        key_line("Tab", "Switch pane or focus"),
        key_line("Enter", "Select / view details"),
        key_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        key_line("/", "Search products or users"),
        key_line("a", "Add a record"),
        key_line("e", "Edit the selected record"),
        key_line("d", "Delete the selected record"),
        key_line("i", "Import products from .xlsx/.csv"),
        key_line("s", "Submit stock out"),
        key_line("x", "Save the report as PDF"),
        key_line("u", "Reload the current tab"),
        key_line("L", "Log out"),
        key_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("        Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let footer = [
        hint_line("Enter", "to sign in", "Esc", "to quit"),
        Line::from(vec![
            Span::styled(" No account? ", styles::muted_style()),
            Span::styled("Ctrl+R", styles::help_key_style()),
            Span::styled(" to register", styles::muted_style()),
        ]),
    ];
    render_auth_overlay(frame, app, &app.login_form, &footer);
}

fn render_register_overlay(frame: &mut Frame, app: &App) {
    let footer = [hint_line("Enter", "to register", "Esc", "back to login")];
    render_auth_overlay(frame, app, &app.register_form, &footer);
}

fn render_auth_overlay(
    frame: &mut Frame,
    app: &App,
    form: &crate::form::Form,
    footer: &[Line<'static>],
) {
    let mut lines = logo_lines();
    lines.push(Line::from(""));
    if let Some(ref notice) = app.status_message {
        lines.push(Line::from(Span::styled(format!(" {}", notice), styles::highlight_style())));
    }
    lines.push(Line::from(Span::styled(format!(" {}", form.title), styles::title_style())));
    lines.push(Line::from(""));
    lines.extend(super::widgets::form_lines(form));
    lines.push(Line::from(""));
    lines.extend(footer.iter().cloned());

    let area = centered_rect_fixed(58, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let prompt = app
        .pending_delete
        .as_ref()
        .map(|target| target.prompt())
        .unwrap_or_default();
    render_confirm(frame, &prompt, "delete", false);
}

fn render_quit_overlay(frame: &mut Frame) {
    render_confirm(frame, "Are you sure you want to quit?", "quit", true);
}

/// Yes/no dialog. Destructive prompts get a red frame instead of the logo.
fn render_confirm(frame: &mut Frame, prompt: &str, verb: &str, with_logo: bool) {
    let mut lines = if with_logo { logo_lines() } else { Vec::new() };
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(format!("   {}", prompt), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   [Y] ", styles::help_key_style()),
            Span::styled(verb.to_string(), styles::muted_style()),
            Span::styled("   [N] ", styles::help_key_style()),
            Span::styled("cancel", styles::muted_style()),
        ]),
    ]);

    let width = (prompt.chars().count() as u16 + 8).clamp(46, 80);
    let area = centered_rect_fixed(width, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let border = if with_logo {
        styles::border_style(true)
    } else {
        styles::error_style()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border);

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
