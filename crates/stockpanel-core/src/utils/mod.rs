//! Display helpers shared by the terminal client and the reports.

pub mod format;
pub mod pagination;

pub use format::{
    format_currency, format_datetime, format_report_date, sanitize_quantity, truncate_text, EMPTY,
    TABLE_TEXT_LIMIT,
};
pub use pagination::{clamp_page, page_window, PageItem};
