//! Output formatters for check results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::class::ClassRegistry;
use crate::engine::CheckResult;
use crate::issue::Issue;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire check result
    fn format(&self, result: &CheckResult, classes: &ClassRegistry) -> String;

    /// Format a single issue
    fn format_issue(&self, issue: &Issue, classes: &ClassRegistry) -> String;
}
