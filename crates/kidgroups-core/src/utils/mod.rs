//! Utility functions for string formatting and matching.

pub mod format;

pub use format::{age_display, contains_ignore_case, format_date, truncate_string};
