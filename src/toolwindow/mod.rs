// Tool window module
// Tabs of REPL sessions, the actions that manage them, and synchronous
// evaluation in the current one

mod actions;
mod bundle;
mod manager;
mod pipe;
mod prompt;
mod session;
mod tabs;

pub use actions::{ActionGroup, PopupMenu, ReplAction, REPL_ACTION_GROUP_ID};
pub use bundle::message;
pub use manager::{
    PaneFactory, ReplToolWindow, SessionFactory, ToolWindow, ToolWindowAnchor, TOOL_WINDOW_ICON,
    TOOL_WINDOW_ID,
};
pub use prompt::{HeadlessPrompter, Prompter};
pub use session::ReplSession;
pub use tabs::{TabBar, TabPlacement};
