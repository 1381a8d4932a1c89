//! Report formatters for migration results

mod json;
mod messages;
mod text;

pub use json::JsonFormatter;
pub use messages::{detailed, format_message, summarized, NOTHING_TO_MIGRATE};
pub use text::TextFormatter;

use crate::finding::BatchReport;

/// Report formatter trait
pub trait ReportFormatter {
    /// Format the report of a whole batch
    fn format(&self, batch: &BatchReport) -> String;
}
