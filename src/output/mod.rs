//! Result presentation

pub mod summary;

pub use summary::{format_json, format_summary_table, verdict_label};
