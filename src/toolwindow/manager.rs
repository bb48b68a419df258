// REPL tool window
//
// Holds every open REPL session, one tab each. All methods run on the
// caller's (UI) thread; output arrives on each session's reader thread.

use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::actions::{ActionGroup, PopupMenu, ReplAction};
use super::bundle::message;
use super::pipe::{pipe, PipeWriter};
use super::prompt::Prompter;
use super::session::ReplSession;
use super::tabs::{TabBar, TabPlacement};
use crate::config::constants::PROMPT_MARKER;
use crate::config::ReplConfig;
use crate::console::{ConsolePane, ContentType};
use crate::errors::Result;
use crate::process::{OutputKind, ProcessListener};
use crate::project::Project;

pub const TOOL_WINDOW_ID: &str = "repl.toolWindow";
pub const TOOL_WINDOW_ICON: &str = "clojure-16x16";
pub const TOOLBAR_PLACE: &str = "ReplToolbar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolWindowAnchor {
    Bottom,
    Left,
    Right,
}

/// Registration details and visibility of the tool window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolWindow {
    id: &'static str,
    title: String,
    icon: &'static str,
    anchor: ToolWindowAnchor,
    visible: bool,
    active: bool,
}

impl ToolWindow {
    fn register() -> Self {
        Self {
            id: TOOL_WINDOW_ID,
            title: message("repl.toolWindowName"),
            icon: TOOL_WINDOW_ICON,
            anchor: ToolWindowAnchor::Bottom,
            visible: false,
            active: false,
        }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon(&self) -> &str {
        self.icon
    }

    pub fn anchor(&self) -> ToolWindowAnchor {
        self.anchor
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        self.visible = true;
        self.active = true;
    }
}

/// Makes the console pane for each new session.
pub type PaneFactory = Box<dyn Fn() -> Arc<dyn ConsolePane> + Send>;

/// How a session gets built. Swapped out in tests.
pub type SessionFactory =
    Box<dyn Fn(&Project, &ReplConfig, &Arc<ActionGroup>, Arc<dyn ConsolePane>) -> Result<ReplSession> + Send>;

pub struct ReplToolWindow {
    project: Project,
    config: ReplConfig,
    window: ToolWindow,
    tabs: TabBar,
    sessions: Vec<ReplSession>,
    actions: Arc<ActionGroup>,
    toolbar: PopupMenu,
    prompter: Box<dyn Prompter>,
    panes: PaneFactory,
    connect: SessionFactory,
}

impl ReplToolWindow {
    pub fn new(
        project: Project,
        config: ReplConfig,
        prompter: Box<dyn Prompter>,
        panes: PaneFactory,
    ) -> Self {
        Self::with_session_factory(project, config, prompter, panes, Box::new(ReplSession::new))
    }

    pub fn with_session_factory(
        project: Project,
        config: ReplConfig,
        prompter: Box<dyn Prompter>,
        panes: PaneFactory,
        connect: SessionFactory,
    ) -> Self {
        let actions = Arc::new(ActionGroup::repl_actions());
        let toolbar = PopupMenu::new(TOOLBAR_PLACE, Arc::clone(&actions));
        let window = ToolWindow::register();
        info!(project = %project.name(), id = window.id(), "REPL tool window registered");

        Self {
            project,
            config,
            window,
            tabs: TabBar::new(TabPlacement::Bottom),
            sessions: Vec::new(),
            actions,
            toolbar,
            prompter,
            panes,
            connect,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &ReplConfig {
        &self.config
    }

    pub fn tool_window(&self) -> &ToolWindow {
        &self.window
    }

    pub fn action_group(&self) -> &Arc<ActionGroup> {
        &self.actions
    }

    pub fn toolbar(&self) -> &PopupMenu {
        &self.toolbar
    }

    pub fn tabs(&self) -> &TabBar {
        &self.tabs
    }

    pub fn tab_titles(&self) -> &[String] {
        self.tabs.titles()
    }

    pub fn sessions(&self) -> &[ReplSession] {
        &self.sessions
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.tabs.selected_index()
    }

    pub fn current_session(&self) -> Option<&ReplSession> {
        self.tabs
            .selected_index()
            .and_then(|index| self.sessions.get(index))
    }

    /// Open a new REPL tab and select it. Returns its index, or `None` if
    /// the connection failed (a warning is shown and nothing changes).
    pub fn create_repl(&mut self) -> Option<usize> {
        let pane = (self.panes)();
        match (self.connect)(&self.project, &self.config, &self.actions, pane) {
            Ok(session) => {
                let title = format!("{}{}", message("repl.title"), self.tabs.tab_count());
                self.sessions.push(session);
                let index = self.tabs.add_tab(title);
                self.tabs.set_selected_index(index);
                debug!(index, "REPL tab added");
                Some(index)
            }
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "Could not start REPL");
                self.prompter.show_warning(
                    &message("config.error.replNotConfiguredTitle"),
                    &message("config.error.replNotConfiguredMessage"),
                );
                None
            }
        }
    }

    /// Close the selected REPL. No-op without a selection.
    pub fn remove_current_repl(&mut self) -> bool {
        let Some(index) = self.tabs.selected_index() else {
            return false;
        };
        if index >= self.sessions.len() {
            return false;
        }

        let session = self.sessions.remove(index);
        session.close();
        self.tabs.remove_tab_at(index);
        true
    }

    /// Ask for a new title for the selected tab.
    pub fn rename_current_repl(&mut self) -> bool {
        let Some(index) = self.tabs.selected_index() else {
            return false;
        };
        let current = self.tabs.title_at(index).unwrap_or_default().to_string();

        match self.prompter.show_input(&message("repl.rename"), &current) {
            Some(name) => self.tabs.set_title_at(index, name),
            None => false,
        }
    }

    pub fn select_repl(&mut self, index: usize) -> bool {
        self.tabs.set_selected_index(index)
    }

    /// Show the tool window and put focus in the current console.
    pub fn request_focus(&mut self) {
        self.window.activate();
        for (i, session) in self.sessions.iter().enumerate() {
            if Some(i) == self.tabs.selected_index() {
                session.view().request_focus();
            } else {
                session.view().clear_focus();
            }
        }
    }

    pub fn perform(&mut self, action: ReplAction) {
        match action {
            ReplAction::Create => {
                self.create_repl();
            }
            ReplAction::Remove => {
                self.remove_current_repl();
            }
            ReplAction::Rename => {
                self.rename_current_repl();
            }
        }
    }

    /// Evaluate `text` in the current REPL and wait for its output.
    ///
    /// The text is echoed into the console like typed input. Returns the
    /// printed output with line breaks removed, or `None` with no REPL open
    /// or when evaluation fails.
    pub fn write_to_current_repl(&mut self, text: &str, request_focus: bool) -> Option<String> {
        let index = self.tabs.selected_index()?;
        if request_focus {
            self.request_focus();
        }
        let session = self.sessions.get(index)?;
        let handler = session.process_handler();

        let (writer, reader) = pipe(self.config.sync_timeout());
        let collector = Arc::new(OutputCollector::new(writer));
        let listener = handler.add_process_listener(collector.clone());

        let result = session
            .view()
            .print(&format!("{}\r\n", text), ContentType::UserInput)
            .map_err(|e| e.into_io())
            .and_then(|()| {
                let mut collected = String::new();
                for line in BufReader::new(reader).lines() {
                    collected.push_str(&line?);
                }
                Ok(collected)
            });

        handler.remove_process_listener(listener);
        collector.finish();

        match result {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Synchronous evaluation failed");
                None
            }
        }
    }

    /// Close every session and clear the tabs.
    pub fn dispose(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        for session in self.sessions.drain(..) {
            session.close();
        }
        self.tabs.clear();
        info!(project = %self.project.name(), "REPL tool window disposed");
    }
}

impl Drop for ReplToolWindow {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Feeds one evaluation's output into a pipe, closing it at the prompt.
struct OutputCollector {
    writer: PipeWriter,
    seen: Mutex<String>,
}

impl OutputCollector {
    fn new(writer: PipeWriter) -> Self {
        Self {
            writer,
            seen: Mutex::new(String::new()),
        }
    }

    fn finish(&self) {
        self.writer.close();
    }
}

impl ProcessListener for OutputCollector {
    fn on_text_available(&self, text: &str, kind: OutputKind) {
        if kind == OutputKind::System || self.writer.is_closed() {
            return;
        }
        if let Err(e) = self.writer.write(text.as_bytes()) {
            warn!(error = %e, "Could not forward REPL output");
            return;
        }

        let mut seen = self.seen.lock().unwrap();
        seen.push_str(text);
        if seen.ends_with(PROMPT_MARKER) {
            self.writer.close();
        }
    }

    fn on_process_terminated(&self) {
        self.writer.close();
    }
}
