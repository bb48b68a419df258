// Console view
//
// A scrollback pane plus an input line. Output printed here goes to the
// pane; user input is echoed and everything typed up to the last line
// terminator is forwarded to the attached process as one submission.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

use super::filters::{classify, MessageFilter};
use super::pane::{ConsolePane, ContentType};
use crate::config::constants::PROMPT_MARKER;
use crate::errors::Result;
use crate::process::{ListenerId, OutputKind, ProcessHandler, ProcessListener};
use crate::project::Project;
use crate::toolwindow::PopupMenu;

/// Input editor behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    pub smart_home: bool,
    pub variable_inplace_rename_enabled: bool,
    pub animated_scrolling: bool,
    pub folding_outline_shown: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            smart_home: false,
            variable_inplace_rename_enabled: false,
            animated_scrolling: false,
            folding_outline_shown: false,
        }
    }
}

pub type KeyListener = Arc<dyn Fn(&ConsoleView, char) + Send + Sync>;

#[derive(Default)]
struct PromptState {
    last: Option<String>,
    seen: usize,
}

struct Attachment {
    handler: Weak<ProcessHandler>,
    listener: ListenerId,
}

pub struct ConsoleView {
    project_name: String,
    pane: Arc<dyn ConsolePane>,
    filters: RwLock<Vec<Arc<dyn MessageFilter>>>,
    attachment: Mutex<Option<Attachment>>,
    pending_input: Mutex<String>,
    content_len: AtomicUsize,
    caret: AtomicUsize,
    prompt: Mutex<PromptState>,
    prompt_changed: Condvar,
    settings: RwLock<EditorSettings>,
    key_listeners: RwLock<Vec<KeyListener>>,
    popup: RwLock<Option<Arc<PopupMenu>>>,
    editor_popup: RwLock<Option<Arc<PopupMenu>>>,
    focused: AtomicBool,
}

impl ConsoleView {
    pub fn new(project: &Project, pane: Arc<dyn ConsolePane>) -> Self {
        Self {
            project_name: project.name().to_string(),
            pane,
            filters: RwLock::new(Vec::new()),
            attachment: Mutex::new(None),
            pending_input: Mutex::new(String::new()),
            content_len: AtomicUsize::new(0),
            caret: AtomicUsize::new(0),
            prompt: Mutex::new(PromptState::default()),
            prompt_changed: Condvar::new(),
            settings: RwLock::new(EditorSettings::default()),
            key_listeners: RwLock::new(Vec::new()),
            popup: RwLock::new(None),
            editor_popup: RwLock::new(None),
            focused: AtomicBool::new(false),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Print `text` with the given styling.
    ///
    /// `UserInput` is echoed, then everything buffered up to the last line
    /// terminator (that terminator removed) goes to the attached process in a
    /// single write. Errors come from that write.
    pub fn print(&self, text: &str, content_type: ContentType) -> Result<()> {
        match content_type {
            ContentType::UserInput => {
                self.append(text, content_type);
                if let Some(submission) = self.take_submission(text) {
                    self.send_input(&submission)?;
                }
            }
            ContentType::NormalOutput => {
                self.append_filtered(text);
                self.track_prompt(text);
            }
            _ => {
                self.append(text, content_type);
                self.track_prompt(text);
            }
        }
        Ok(())
    }

    pub fn add_message_filter(&self, filter: Arc<dyn MessageFilter>) {
        self.filters.write().unwrap().push(filter);
    }

    /// Route the handler's output into this console.
    pub fn attach_to_process(self: &Arc<Self>, handler: &Arc<ProcessHandler>) {
        self.detach_from_process();

        let listener = handler.add_process_listener(Arc::new(ConsoleProcessListener {
            view: Arc::downgrade(self),
        }));
        *self.attachment.lock().unwrap() = Some(Attachment {
            handler: Arc::downgrade(handler),
            listener,
        });
    }

    pub fn detach_from_process(&self) {
        let Some(attachment) = self.attachment.lock().unwrap().take() else {
            return;
        };
        if let Some(handler) = attachment.handler.upgrade() {
            handler.remove_process_listener(attachment.listener);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attachment
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|a| a.handler.strong_count() > 0)
    }

    pub fn settings(&self) -> EditorSettings {
        self.settings.read().unwrap().clone()
    }

    pub fn update_settings(&self, f: impl FnOnce(&mut EditorSettings)) {
        f(&mut self.settings.write().unwrap());
    }

    pub fn add_key_listener(&self, listener: KeyListener) {
        self.key_listeners.write().unwrap().push(listener);
    }

    /// Deliver a typed character to key listeners.
    pub fn type_key(&self, ch: char) {
        let listeners: Vec<KeyListener> = self.key_listeners.read().unwrap().clone();
        for listener in listeners {
            listener(self, ch);
        }
    }

    pub fn caret_offset(&self) -> usize {
        self.caret.load(Ordering::SeqCst)
    }

    pub fn set_caret_offset(&self, offset: usize) {
        self.caret
            .store(offset.min(self.content_length()), Ordering::SeqCst);
    }

    pub fn move_caret_to_end(&self) {
        self.caret.store(self.content_length(), Ordering::SeqCst);
    }

    /// Length of the console document in characters.
    pub fn content_length(&self) -> usize {
        self.content_len.load(Ordering::SeqCst)
    }

    pub fn set_popup(&self, popup: Arc<PopupMenu>) {
        *self.popup.write().unwrap() = Some(popup);
    }

    pub fn popup(&self) -> Option<Arc<PopupMenu>> {
        self.popup.read().unwrap().clone()
    }

    pub fn set_editor_popup(&self, popup: Arc<PopupMenu>) {
        *self.editor_popup.write().unwrap() = Some(popup);
    }

    pub fn editor_popup(&self) -> Option<Arc<PopupMenu>> {
        self.editor_popup.read().unwrap().clone()
    }

    pub fn request_focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
    }

    pub fn clear_focus(&self) {
        self.focused.store(false, Ordering::SeqCst);
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    /// The most recent `<ns>=>` line printed, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompt.lock().unwrap().last.clone()
    }

    /// Number of prompts printed so far.
    pub fn prompts_seen(&self) -> usize {
        self.prompt.lock().unwrap().seen
    }

    /// Block until more than `seen` prompts have been printed. Returns false on timeout.
    pub fn wait_for_prompt(&self, seen: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.prompt.lock().unwrap();
        while state.seen <= seen {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.prompt_changed.wait_timeout(state, deadline - now).unwrap().0;
        }
        true
    }

    pub fn clear(&self) {
        self.pane.clear();
        self.content_len.store(0, Ordering::SeqCst);
        self.caret.store(0, Ordering::SeqCst);
    }

    /// Detach from the process and drop listeners and menus.
    pub fn dispose(&self) {
        self.detach_from_process();
        self.key_listeners.write().unwrap().clear();
        self.popup.write().unwrap().take();
        self.editor_popup.write().unwrap().take();
        self.pending_input.lock().unwrap().clear();
    }

    fn append(&self, text: &str, content_type: ContentType) {
        self.pane.append(text, content_type);
        self.content_len
            .fetch_add(text.chars().count(), Ordering::SeqCst);
    }

    /// Append process output, letting filters restyle individual lines.
    fn append_filtered(&self, text: &str) {
        let filters = self.filters.read().unwrap().clone();
        if filters.is_empty() {
            self.append(text, ContentType::NormalOutput);
            return;
        }

        // Runs of lines with the same styling go out as one append
        let mut run = String::new();
        let mut run_type = ContentType::NormalOutput;
        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\r', '\n']);
            let line_type = classify(&filters, content).unwrap_or(ContentType::NormalOutput);
            if line_type != run_type && !run.is_empty() {
                self.append(&run, run_type);
                run.clear();
            }
            run_type = line_type;
            run.push_str(line);
        }
        if !run.is_empty() {
            self.append(&run, run_type);
        }
    }

    fn track_prompt(&self, text: &str) {
        if !text.ends_with(PROMPT_MARKER) {
            return;
        }
        let line = text.rsplit('\n').next().unwrap_or(text);
        let mut state = self.prompt.lock().unwrap();
        state.last = Some(line.to_string());
        state.seen += 1;
        self.prompt_changed.notify_all();
    }

    /// Buffer typed text. Once a line terminator arrives, returns everything
    /// up to the last one with that final terminator stripped.
    fn take_submission(&self, text: &str) -> Option<String> {
        let mut pending = self.pending_input.lock().unwrap();
        pending.push_str(text);

        let pos = pending.rfind('\n')?;
        let chunk: String = pending.drain(..=pos).collect();
        let chunk = chunk.strip_suffix('\n').unwrap_or(&chunk);
        Some(chunk.strip_suffix('\r').unwrap_or(chunk).to_string())
    }

    fn send_input(&self, input: &str) -> Result<()> {
        let handler = self
            .attachment
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|a| a.handler.upgrade());

        match handler {
            Some(handler) => handler.write_input(input.as_bytes()),
            None => {
                debug!(project = %self.project_name, "Input with no process attached");
                Ok(())
            }
        }
    }
}

struct ConsoleProcessListener {
    view: Weak<ConsoleView>,
}

impl ProcessListener for ConsoleProcessListener {
    fn on_text_available(&self, text: &str, kind: OutputKind) {
        let Some(view) = self.view.upgrade() else {
            return;
        };
        let content_type = match kind {
            OutputKind::Stdout => ContentType::NormalOutput,
            OutputKind::Stderr => ContentType::ErrorOutput,
            OutputKind::System => ContentType::SystemOutput,
        };
        // Only user input can fail to print
        let _ = view.print(text, content_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::filters::ErrorLineFilter;
    use crate::console::pane::BufferPane;
    use crate::errors::BridgeError;
    use crate::process::{ErrorSource, ProcessIo, ProcessLifecycle, ResponseSource};
    use std::io::{self, Write};
    use std::sync::mpsc::{self, Sender};

    fn view() -> (Arc<ConsoleView>, Arc<BufferPane>) {
        let pane = Arc::new(BufferPane::new());
        let project = Project::new("demo", "/tmp/demo");
        (Arc::new(ConsoleView::new(&project, pane.clone())), pane)
    }

    /// Stdin that reports each write on a channel and answers with a prompt.
    struct Recording {
        lines: Sender<Vec<u8>>,
        output: Sender<Vec<u8>>,
    }

    impl Write for Recording {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let _ = self.lines.send(buf.to_vec());
            let _ = self.output.send(b"nil\nuser=>".to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Immortal;

    impl ProcessLifecycle for Immortal {
        fn wait_for(&self) {}

        fn exit_value(&self) -> Result<i32> {
            Err(BridgeError::Unsupported("exitValue"))
        }

        fn destroy(&self) -> Result<()> {
            Err(BridgeError::Unsupported("destroy"))
        }
    }

    fn recording_handler() -> (Arc<ProcessHandler>, mpsc::Receiver<Vec<u8>>) {
        let (lines_tx, lines_rx) = mpsc::channel();
        let (out_tx, out_rx) = crate::process::response_queue();
        let io = ProcessIo {
            stdin: Box::new(Recording {
                lines: lines_tx,
                output: out_tx,
            }),
            stdout: Box::new(ResponseSource::new(out_rx)),
            stderr: Box::new(ErrorSource),
            lifecycle: Arc::new(Immortal),
        };
        let handler = Arc::new(ProcessHandler::new(io, "/tmp", Duration::from_millis(1)));
        (handler, lines_rx)
    }

    #[test]
    fn test_user_input_sent_once_terminated() {
        let (view, pane) = view();
        let (handler, lines) = recording_handler();
        view.attach_to_process(&handler);

        view.print("(+ 1", ContentType::UserInput).unwrap();
        assert!(lines.try_recv().is_err());

        view.print(" 2)\r\n(inc 1)\n", ContentType::UserInput).unwrap();
        assert_eq!(lines.try_recv().unwrap(), b"(+ 1 2)\r\n(inc 1)".to_vec());
        assert!(lines.try_recv().is_err());
        assert_eq!(
            pane.text_of(ContentType::UserInput),
            "(+ 1 2)\r\n(inc 1)\n"
        );
    }

    #[test]
    fn test_multiline_form_is_one_write() {
        let (view, _pane) = view();
        let (handler, lines) = recording_handler();
        view.attach_to_process(&handler);

        view.print("(defn f []\n  1)\r\n(partial", ContentType::UserInput).unwrap();
        assert_eq!(lines.try_recv().unwrap(), b"(defn f []\n  1)".to_vec());
        assert!(lines.try_recv().is_err());

        // The unterminated tail waits for its own terminator
        view.print(")\n", ContentType::UserInput).unwrap();
        assert_eq!(lines.try_recv().unwrap(), b"(partial)".to_vec());
    }

    #[test]
    fn test_attached_output_reaches_pane() {
        let (view, pane) = view();
        let (handler, _lines) = recording_handler();
        view.attach_to_process(&handler);
        handler.start_notify().unwrap();

        let seen = view.prompts_seen();
        view.print("(println 1)\n", ContentType::UserInput).unwrap();
        assert!(view.wait_for_prompt(seen, Duration::from_secs(5)));
        assert_eq!(pane.text_of(ContentType::NormalOutput), "nil\nuser=>");
        assert_eq!(view.last_prompt().as_deref(), Some("user=>"));
    }

    #[test]
    fn test_detach_stops_output() {
        let (view, _pane) = view();
        let (handler, _lines) = recording_handler();
        view.attach_to_process(&handler);
        assert!(view.is_attached());
        assert_eq!(handler.listener_count(), 1);

        view.detach_from_process();
        assert!(!view.is_attached());
        assert_eq!(handler.listener_count(), 0);
    }

    #[test]
    fn test_filter_restyles_error_lines() {
        let (view, pane) = view();
        view.add_message_filter(Arc::new(ErrorLineFilter));

        view.print(
            "Execution error (ArithmeticException) at user/eval1 (REPL:1).\nDivide by zero\nuser=>",
            ContentType::NormalOutput,
        )
        .unwrap();

        let entries = pane.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, ContentType::ErrorOutput);
        assert!(entries[0].0.starts_with("Execution error"));
        assert_eq!(entries[1], ("Divide by zero\nuser=>".to_string(), ContentType::NormalOutput));
    }

    #[test]
    fn test_key_listener_and_caret() {
        let (view, _pane) = view();
        view.print("hello\n", ContentType::SystemOutput).unwrap();
        assert_eq!(view.content_length(), 6);
        view.set_caret_offset(2);

        view.add_key_listener(Arc::new(|v: &ConsoleView, _ch: char| v.move_caret_to_end()));
        view.type_key('a');
        assert_eq!(view.caret_offset(), 6);
    }

    #[test]
    fn test_input_without_process_is_echo_only() {
        let (view, pane) = view();
        view.print("(+ 1 1)\n", ContentType::UserInput).unwrap();
        assert_eq!(pane.text(), "(+ 1 1)\n");
    }
}
