// nrepl-bridge - Clojure REPL sessions over nREPL
// Library exports

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod logging;
pub mod nrepl;
pub mod process;
pub mod project;
pub mod toolwindow;

pub use errors::{BridgeError, Result};
