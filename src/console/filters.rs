// Message filters
//
// Console coloring is decided from content, not from which stream the text
// came from: the nREPL sends errors as ordinary text on the output stream.

use super::pane::ContentType;

pub trait MessageFilter: Send + Sync {
    /// Content type to use for `line`, or `None` to leave it alone.
    fn apply(&self, line: &str) -> Option<ContentType>;
}

/// Marks Clojure error reports and stack trace lines as error output.
pub struct ErrorLineFilter;

const ERROR_PREFIXES: &[&str] = &[
    "Syntax error",
    "Execution error",
    "CompilerException",
    "Caused by:",
    "Exception in thread",
];

impl MessageFilter for ErrorLineFilter {
    fn apply(&self, line: &str) -> Option<ContentType> {
        let trimmed = line.trim_start();
        let first_word = trimmed.split_whitespace().next().unwrap_or("");

        let is_error = ERROR_PREFIXES.iter().any(|p| trimmed.starts_with(p))
            || first_word.ends_with("Exception")
            || first_word.ends_with("Exception:")
            || (trimmed.starts_with("at ") && trimmed.contains('(') && trimmed.ends_with(')'));

        is_error.then_some(ContentType::ErrorOutput)
    }
}

/// Content type for `line` after running it through `filters` (first match wins).
pub fn classify(filters: &[std::sync::Arc<dyn MessageFilter>], line: &str) -> Option<ContentType> {
    filters.iter().find_map(|f| f.apply(line))
}
