// Project-wide constants
//
// Centralised here so the default server address and other magic values
// have one source of truth. Import via `use crate::config::constants::*;`.

/// URL scheme accepted by the nREPL client.
pub const NREPL_SCHEME: &str = "nrepl";

/// Default nREPL server the tool window connects to.
pub const DEFAULT_NREPL_URL: &str = "nrepl://localhost:54050";

/// Environment variable overriding the configured server URL.
pub const URL_ENV_VAR: &str = "NREPL_BRIDGE_URL";

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// How often the process handler polls the response stream when idle.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Namespace every session starts in.
pub const INITIAL_NAMESPACE: &str = "user";

/// Expression submitted when a session opens; its result is the banner.
pub const GREETING_EXPR: &str = "(symbol (str \"Clojure \" (clojure-version)))";

/// Terminates every rendered response and marks the end of a reply.
pub const PROMPT_MARKER: &str = "=>";

/// Config directory under the user's home.
pub const CONFIG_DIR: &str = ".nrepl-bridge";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
