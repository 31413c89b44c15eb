//! Terminal reporting.

mod format;

pub use format::{format_adaptive_summary, format_fit_summary, format_interval};
