// Console panes - where console text ends up
//
// TerminalPane writes styled text to stdout; BufferPane keeps it in memory
// for headless runs and tests.

use crossterm::style::Stylize;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::config::constants::PROMPT_MARKER;

/// How a piece of console text is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    NormalOutput,
    ErrorOutput,
    SystemOutput,
    UserInput,
}

pub trait ConsolePane: Send + Sync {
    fn append(&self, text: &str, content_type: ContentType);

    fn clear(&self);
}

/// In-memory pane.
#[derive(Default)]
pub struct BufferPane {
    entries: Mutex<Vec<(String, ContentType)>>,
}

impl BufferPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far, concatenated.
    pub fn text(&self) -> String {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Text of one content type only.
    pub fn text_of(&self, content_type: ContentType) -> String {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, ct)| *ct == content_type)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    pub fn entries(&self) -> Vec<(String, ContentType)> {
        self.entries.lock().unwrap().clone()
    }
}

impl ConsolePane for BufferPane {
    fn append(&self, text: &str, content_type: ContentType) {
        self.entries
            .lock()
            .unwrap()
            .push((text.to_string(), content_type));
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Pane backed by the terminal.
///
/// The line editor echoes what the user typed and draws the prompt itself,
/// so by default user input and the trailing `<ns>=>` line are not printed.
#[derive(Default)]
pub struct TerminalPane {
    echo_input: bool,
    show_prompt: bool,
}

impl TerminalPane {
    pub fn new(echo_input: bool, show_prompt: bool) -> Self {
        Self {
            echo_input,
            show_prompt,
        }
    }
}

impl ConsolePane for TerminalPane {
    fn append(&self, text: &str, content_type: ContentType) {
        if content_type == ContentType::UserInput && !self.echo_input {
            return;
        }

        let text = if self.show_prompt || content_type == ContentType::UserInput {
            text
        } else {
            strip_prompt_line(text)
        };
        if text.is_empty() {
            return;
        }

        let mut stdout = io::stdout().lock();
        let _ = match content_type {
            ContentType::NormalOutput => write!(stdout, "{}", text),
            ContentType::ErrorOutput => write!(stdout, "{}", text.red()),
            ContentType::SystemOutput => write!(stdout, "{}", text.dark_grey()),
            ContentType::UserInput => write!(stdout, "{}", text.bold()),
        };
        let _ = stdout.flush();
    }

    fn clear(&self) {
        let _ = io::stdout().flush();
    }
}

/// Drop a trailing `<ns>=>` line, keeping everything before it.
pub fn strip_prompt_line(text: &str) -> &str {
    if !text.ends_with(PROMPT_MARKER) {
        return text;
    }
    match text.rfind('\n') {
        Some(pos) => &text[..=pos],
        None => "",
    }
}
