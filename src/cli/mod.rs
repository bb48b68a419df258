// CLI module
// Terminal front end: slash commands, dialogs, and the interactive loop

mod commands;
mod prompter;
mod repl;

pub use commands::{handle_command, Command};
pub use prompter::TerminalPrompter;
pub use repl::Repl;
