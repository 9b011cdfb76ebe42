//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, status bar and overlays
//! - `input`: keyboard event handling
//! - `styles`: color scheme
//! - `transfer`: the two-column transfer view
//! - `groups`: the group management modal

pub mod groups;
pub mod input;
pub mod render;
pub mod styles;
pub mod transfer;
