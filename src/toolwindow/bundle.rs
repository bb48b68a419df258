// User-facing strings, looked up by key

use once_cell::sync::Lazy;
use std::collections::HashMap;

static MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("repl.toolWindowName", "Clojure REPL"),
        ("repl.title", "Clojure REPL "),
        ("repl.rename", "Rename REPL"),
        ("repl.closed", "nREPL session closed"),
        ("repl.noneOpen", "No REPL open. Use /new to start one."),
        ("action.create", "New REPL"),
        ("action.remove", "Close REPL"),
        ("action.rename", "Rename REPL"),
        ("config.error.replNotConfiguredTitle", "REPL not configured"),
        (
            "config.error.replNotConfiguredMessage",
            "Could not connect to the nREPL server. Check the configured URL and that the server is running.",
        ),
    ])
});

/// Message text for `key`. Unknown keys come back wrapped in `!` so they stand out.
pub fn message(key: &str) -> String {
    match MESSAGES.get(key) {
        Some(text) => (*text).to_string(),
        None => format!("!{}!", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_keys() {
        assert_eq!(message("repl.title"), "Clojure REPL ");
        assert_eq!(message("no.such.key"), "!no.such.key!");
    }
}
