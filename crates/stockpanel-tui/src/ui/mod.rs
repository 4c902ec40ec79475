//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, overlays and the status bar
//! - `input`: keyboard handling per overlay and tab
//! - `styles`: colors and text styling
//! - `widgets`: tables, pagers and form blocks shared by the tabs
//! - `tabs`: one module per main tab

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
pub mod widgets;
