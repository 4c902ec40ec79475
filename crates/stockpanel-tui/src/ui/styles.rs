//! Colors and text styles.

use ratatui::style::{Color, Modifier, Style};

pub const BRAND: Color = Color::Rgb(38, 166, 154);
pub const OK: Color = Color::Rgb(102, 187, 106);
pub const WARN: Color = Color::Rgb(255, 183, 77);
pub const DANGER: Color = Color::Rgb(229, 83, 83);
pub const DIM: Color = Color::Rgb(120, 124, 130);
const ROW_BG: Color = Color::Rgb(40, 52, 58);
const BAR_BG: Color = Color::Rgb(28, 34, 38);

pub fn title_style() -> Style {
    Style::new().fg(BRAND).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::new().bg(ROW_BG).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::new().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::new().fg(DIM)
}

pub fn highlight_style() -> Style {
    Style::new().fg(WARN)
}

pub fn success_style() -> Style {
    Style::new().fg(OK)
}

pub fn error_style() -> Style {
    Style::new().fg(DANGER)
}

/// Quantity cell: red when nothing is left, amber when low.
pub fn stock_style(quantity: i64, low_threshold: i64) -> Style {
    match quantity {
        q if q <= 0 => error_style(),
        q if q <= low_threshold => highlight_style(),
        _ => list_item_style(),
    }
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        title_style().add_modifier(Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    Style::new().fg(if focused { BRAND } else { DIM })
}

pub fn search_style() -> Style {
    highlight_style().add_modifier(Modifier::BOLD)
}

pub fn status_bar_style() -> Style {
    Style::new().bg(BAR_BG).fg(Color::White)
}

pub fn help_key_style() -> Style {
    highlight_style().add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    list_item_style()
}
