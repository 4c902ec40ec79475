//! Page-number window for paged tables.
//!
//! Always shows the first and last `BOUNDARY` pages and `SIBLINGS` pages on
//! either side of the current one, collapsing the rest into gaps. When the
//! total is small enough that a gap would hide nothing useful, every page
//! is listed.

/// Pages shown on each side of the current page.
pub const SIBLINGS: u32 = 1;

/// Pages always shown at the start and at the end.
pub const BOUNDARY: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Gap,
}

impl std::fmt::Display for PageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Gap => f.write_str("…"),
        }
    }
}

fn pages(start: u32, end: u32) -> impl Iterator<Item = PageItem> {
    (start..=end).map(PageItem::Page)
}

/// Items to render for `current` out of `total` pages.
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return vec![PageItem::Page(1)];
    }

    // Boundaries, siblings, the current page and two gaps.
    let total_numbers = BOUNDARY * 2 + SIBLINGS * 2 + 3;
    if total <= total_numbers {
        return pages(1, total).collect();
    }

    let current = current.clamp(1, total);
    let left_sibling = current.saturating_sub(SIBLINGS).max(BOUNDARY + 2);
    let right_sibling = (current + SIBLINGS).min(total - BOUNDARY - 1);

    let show_left_gap = left_sibling > BOUNDARY + 2;
    let show_right_gap = right_sibling < total - BOUNDARY - 1;

    let end_pages = pages(total - BOUNDARY + 1, total);
    let edge_count = BOUNDARY + SIBLINGS * 2 + 2;

    match (show_left_gap, show_right_gap) {
        (false, true) => pages(1, edge_count)
            .chain(std::iter::once(PageItem::Gap))
            .chain(end_pages)
            .collect(),
        (true, false) => pages(1, BOUNDARY)
            .chain(std::iter::once(PageItem::Gap))
            .chain(pages(total - edge_count + 1, total))
            .collect(),
        _ => pages(1, BOUNDARY)
            .chain(std::iter::once(PageItem::Gap))
            .chain(pages(left_sibling, right_sibling))
            .chain(std::iter::once(PageItem::Gap))
            .chain(end_pages)
            .collect(),
    }
}

/// Clamp a requested page into range.
pub fn clamp_page(page: u32, total: u32) -> u32 {
    page.clamp(1, total.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Gap, Page};

    fn render(items: &[PageItem]) -> String {
        items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_totals_list_every_page() {
        assert_eq!(page_window(1, 0), vec![Page(1)]);
        assert_eq!(page_window(1, 1), vec![Page(1)]);
        assert_eq!(render(&page_window(3, 7)), "1 2 3 4 5 6 7");
    }

    #[test]
    fn test_near_start() {
        assert_eq!(render(&page_window(1, 10)), "1 2 3 4 5 … 10");
        assert_eq!(render(&page_window(3, 10)), "1 2 3 4 5 … 10");
    }

    #[test]
    fn test_near_end() {
        assert_eq!(render(&page_window(10, 10)), "1 … 6 7 8 9 10");
        assert_eq!(render(&page_window(8, 10)), "1 … 6 7 8 9 10");
    }

    #[test]
    fn test_middle_has_two_gaps() {
        let items = page_window(5, 10);
        assert_eq!(render(&items), "1 … 4 5 6 … 10");
        assert_eq!(items.iter().filter(|i| **i == Gap).count(), 2);
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 5), 1);
        assert_eq!(clamp_page(9, 5), 5);
        assert_eq!(clamp_page(3, 0), 1);
    }
}
