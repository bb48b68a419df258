// Dialogs the tool window needs: warnings and single-line input

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::warn;

pub trait Prompter: Send {
    fn show_warning(&self, title: &str, message: &str);

    /// Ask for a line of text. `None` means cancelled.
    fn show_input(&self, title: &str, initial: &str) -> Option<String>;
}

/// Prompter for runs without a user at the keyboard.
///
/// Warnings go to the log and are kept; answers are taken from a queue,
/// and an empty queue cancels.
#[derive(Default)]
pub struct HeadlessPrompter {
    answers: Mutex<VecDeque<Option<String>>>,
    warnings: Mutex<Vec<(String, String)>>,
}

impl HeadlessPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn push_answer(&self, answer: Option<String>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn warnings(&self) -> Vec<(String, String)> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Prompter for HeadlessPrompter {
    fn show_warning(&self, title: &str, message: &str) {
        warn!(title, "{}", message);
        self.warnings
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn show_input(&self, _title: &str, _initial: &str) -> Option<String> {
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

impl<P: Prompter + Sync> Prompter for std::sync::Arc<P> {
    fn show_warning(&self, title: &str, message: &str) {
        (**self).show_warning(title, message)
    }

    fn show_input(&self, title: &str, initial: &str) -> Option<String> {
        (**self).show_input(title, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_answers_in_order() {
        let prompter = HeadlessPrompter::with_answers([Some("one".to_string()), None]);
        assert_eq!(prompter.show_input("t", "x").as_deref(), Some("one"));
        assert_eq!(prompter.show_input("t", "x"), None);
        assert_eq!(prompter.show_input("t", "x"), None);
    }

    #[test]
    fn test_headless_records_warnings() {
        let prompter = HeadlessPrompter::new();
        prompter.show_warning("Title", "Body");
        assert_eq!(prompter.warnings(), vec![("Title".to_string(), "Body".to_string())]);
    }
}
