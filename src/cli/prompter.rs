// Terminal dialogs

use crossterm::style::Stylize;
use std::io::{self, Write};

use crate::toolwindow::Prompter;

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn show_warning(&self, title: &str, message: &str) {
        eprintln!("{} {}", format!("{}:", title).yellow().bold(), message);
    }

    fn show_input(&self, title: &str, initial: &str) -> Option<String> {
        print!("{} [{}]: ", title.bold(), initial);
        io::stdout().flush().ok()?;

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    None
                } else {
                    Some(input.to_string())
                }
            }
        }
    }
}
