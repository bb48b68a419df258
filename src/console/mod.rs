// Console module
// Scrollback, input handling, and output styling for one REPL session

mod filters;
mod pane;
mod view;

pub use filters::{ErrorLineFilter, MessageFilter};
pub use pane::{strip_prompt_line, BufferPane, ConsolePane, ContentType, TerminalPane};
pub use view::{ConsoleView, EditorSettings, KeyListener};
