// Interactive terminal front end for the REPL tool window

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::config::constants::CONFIG_DIR;
use crate::toolwindow::{message, ReplToolWindow};

use super::commands::{handle_command, Command};

const HISTORY_FILE: &str = "history";

pub struct Repl {
    window: ReplToolWindow,
    editor: DefaultEditor,
    history: Option<PathBuf>,
    is_interactive: bool,
}

impl Repl {
    pub fn new(window: ReplToolWindow) -> Result<Self> {
        let editor = DefaultEditor::new().context("Failed to initialize line editor")?;
        let history = dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(HISTORY_FILE));

        Ok(Self {
            window,
            editor,
            history,
            is_interactive: io::stdout().is_terminal(),
        })
    }

    pub fn window(&self) -> &ReplToolWindow {
        &self.window
    }

    pub fn run(&mut self) -> Result<()> {
        if let Some(path) = &self.history {
            let _ = self.editor.load_history(path);
        }

        if self.is_interactive {
            println!(
                "{} v{} - {}",
                "nrepl-bridge".bold(),
                env!("CARGO_PKG_VERSION"),
                self.window.config().url
            );
            println!("Type /help for commands.");
        }

        if self.window.create_repl().is_some() {
            self.window.request_focus();
        }

        loop {
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    if let Some(command) = Command::parse(line, self.window.action_group()) {
                        if command == Command::Quit {
                            if self.is_interactive {
                                println!("Goodbye!");
                            }
                            break;
                        }
                        let output = handle_command(command, &mut self.window)?;
                        println!("{}", output);
                        continue;
                    }

                    self.evaluate(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(e) => {
                    eprintln!("Readline error: {}", e);
                    break;
                }
            }
        }

        if let Some(path) = &self.history {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            let _ = self.editor.save_history(path);
        }

        self.window.dispose();
        Ok(())
    }

    fn evaluate(&mut self, line: &str) {
        let Some(session) = self.window.current_session() else {
            println!("{}", message("repl.noneOpen"));
            return;
        };
        for ch in line.chars() {
            session.view().type_key(ch);
        }

        if self.window.write_to_current_repl(line, true).is_none() {
            eprintln!("{}", "Evaluation failed; see log for details".red());
        }
    }

    /// `<ns>=> ` of the current REPL, or a plain marker without one.
    fn prompt(&self) -> String {
        match self
            .window
            .current_session()
            .and_then(|session| session.view().last_prompt())
        {
            Some(prompt) => format!("{} ", prompt),
            None => "> ".to_string(),
        }
    }
}
