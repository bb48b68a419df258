// One REPL tab: an nREPL connection, its process handler, and its console

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info};
use uuid::Uuid;

use super::actions::{ActionGroup, PopupMenu};
use crate::config::ReplConfig;
use crate::console::{ConsolePane, ConsoleView, ErrorLineFilter};
use crate::errors::Result;
use crate::process::{NreplProcess, ProcessHandler, ProcessIo, ProcessTerminatedListener};
use crate::project::Project;

pub const CONSOLE_POPUP_PLACE: &str = "ReplConsolePopup";
pub const EDITOR_POPUP_PLACE: &str = "ReplEditorPopup";

pub struct ReplSession {
    id: Uuid,
    created_at: DateTime<Local>,
    url: String,
    view: Arc<ConsoleView>,
    process_handler: Arc<ProcessHandler>,
}

impl ReplSession {
    /// Connect to the configured nREPL server and wire up a console for it.
    pub fn new(
        project: &Project,
        config: &ReplConfig,
        actions: &Arc<ActionGroup>,
        pane: Arc<dyn ConsolePane>,
    ) -> Result<Self> {
        let process = NreplProcess::connect(config)?;
        let session =
            Self::from_process(project, config, actions, pane, process.into_io(), &config.url)?;

        // The greeting reply is already queued; let it reach the console
        // before anyone else listens for output
        if config.greeting_expr().is_some() {
            let timeout = Duration::from_millis(config.connect_timeout_ms);
            if !session.view.wait_for_prompt(0, timeout) {
                debug!(session = %session.id, "Greeting not shown before timeout");
            }
        }
        Ok(session)
    }

    /// Build a session around an already-running process.
    pub fn from_process(
        project: &Project,
        config: &ReplConfig,
        actions: &Arc<ActionGroup>,
        pane: Arc<dyn ConsolePane>,
        io: ProcessIo,
        url: &str,
    ) -> Result<Self> {
        let process_handler = Arc::new(ProcessHandler::new(
            io,
            project.base_dir(),
            config.poll_interval(),
        ));
        ProcessTerminatedListener::attach(&process_handler);

        let view = Arc::new(ConsoleView::new(project, pane));
        view.attach_to_process(&process_handler);
        if config.filters.error_highlighting {
            view.add_message_filter(Arc::new(ErrorLineFilter));
        }

        view.update_settings(|settings| {
            settings.smart_home = true;
            settings.variable_inplace_rename_enabled = true;
            settings.animated_scrolling = true;
            settings.folding_outline_shown = true;
        });

        // Typing anywhere jumps to the input position
        view.add_key_listener(Arc::new(|view: &ConsoleView, _ch: char| {
            view.move_caret_to_end()
        }));

        view.set_popup(Arc::new(PopupMenu::new(CONSOLE_POPUP_PLACE, Arc::clone(actions))));
        view.set_editor_popup(Arc::new(PopupMenu::new(EDITOR_POPUP_PLACE, Arc::clone(actions))));

        process_handler.start_notify()?;

        let session = Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            url: url.to_string(),
            view,
            process_handler,
        };
        info!(session = %session.id, url = %session.url, "REPL session opened");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn view(&self) -> &Arc<ConsoleView> {
        &self.view
    }

    pub fn process_handler(&self) -> &Arc<ProcessHandler> {
        &self.process_handler
    }

    /// Tear down the connection, then release the console.
    pub fn close(&self) {
        self.process_handler.destroy_process();
        self.view.dispose();
        debug!(session = %self.id, "REPL session closed");
    }
}
