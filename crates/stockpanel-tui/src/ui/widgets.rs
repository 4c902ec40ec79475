//! Building blocks shared by the tabs and overlays.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use stockpanel_core::utils::{page_window, PageItem};

use crate::form::Form;
use crate::ui::styles;

/// Width of the label column in forms.
const FORM_LABEL_WIDTH: usize = 18;

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

/// Bordered block with the focus-dependent border color.
pub fn panel(title: impl Into<String>, focused: bool) -> Block<'static> {
    Block::default()
        .title(title.into())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused))
}

/// "Page: 1 … 4 [5] 6 … 10" with n/p hints.
pub fn pager_line(current: u32, total: u32) -> Line<'static> {
    let mut spans = vec![Span::styled(" Page: ", styles::muted_style())];
    for item in page_window(current, total) {
        match item {
            PageItem::Page(n) if n == current => {
                spans.push(Span::styled(format!("[{}]", n), styles::highlight_style()));
            }
            other => spans.push(Span::styled(other.to_string(), styles::muted_style())),
        }
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(" [p]rev [n]ext", styles::muted_style()));
    Line::from(spans)
}

/// "Label: value" line for detail panels.
pub fn detail_line(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<16}", format!("{}:", label)), styles::highlight_style()),
        Span::styled(value.into(), styles::list_item_style()),
    ])
}

pub fn placeholder(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, styles::muted_style()))
}

/// Lines for a form: one row per field, then the button and any error.
pub fn form_lines(form: &Form) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(form.fields.len() + 4);

    for (i, field) in form.fields.iter().enumerate() {
        let focused = form.focus == i;
        let style = if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let cursor = if focused { "▌" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {:>width$}: ", field.label, width = FORM_LABEL_WIDTH),
                styles::muted_style(),
            ),
            Span::styled(format!("{}{}", form.display_value(i), cursor), style),
        ]));
    }

    lines.push(Line::from(""));
    let label = if form.submitting {
        "Please wait...".to_string()
    } else if form.on_submit() {
        format!(" ▶ {} ◀ ", form.submit_label)
    } else {
        format!("   {}   ", form.submit_label)
    };
    let button_style = if form.on_submit() {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    lines.push(Line::from(vec![
        Span::raw(" ".repeat(FORM_LABEL_WIDTH + 3)),
        Span::raw("["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }
    lines
}

/// Draw a form as a centered modal with optional footer hint lines.
pub fn render_form_modal(frame: &mut Frame, form: &Form, width: u16, footer: &[Line<'static>]) {
    let mut lines = vec![Line::from("")];
    lines.extend(form_lines(form));
    if !footer.is_empty() {
        lines.push(Line::from(""));
        lines.extend(footer.iter().cloned());
    }

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(width, height, frame.area());
    frame.render_widget(Clear, area);

    let paragraph = Paragraph::new(lines)
        .block(panel(format!(" {} ", form.title), true))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_centered_rect_fixed() {
        let area = centered_rect_fixed(40, 10, Rect::new(0, 0, 100, 30));
        assert_eq!(area, Rect::new(30, 10, 40, 10));

        // Clamped to the available space
        let small = centered_rect_fixed(40, 10, Rect::new(0, 0, 20, 5));
        assert_eq!(small.width, 20);
        assert_eq!(small.height, 5);
    }

    #[test]
    fn test_pager_line_marks_current_page() {
        let line = text(&pager_line(5, 10));
        assert!(line.contains("1 … 4 [5] 6 … 10"));
    }

    #[test]
    fn test_form_lines_mask_secrets() {
        let mut form = Form::new("Login", "Login").field("Email", "a@b.co").secret("Password");
        form.set_value(1, "hunter2");
        form.error = Some("Invalid email or password.".to_string());

        let lines: Vec<String> = form_lines(&form).iter().map(text).collect();
        assert!(lines[1].ends_with("*******"));
        assert!(!lines.iter().any(|l| l.contains("hunter2")));
        assert!(lines.last().is_some_and(|l| l.contains("Invalid email or password.")));
    }
}
