// Slash command handling

use anyhow::Result;

use crate::toolwindow::{message, ActionGroup, ReplAction, ReplToolWindow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Tabs,
    Switch(usize),
    Action(ReplAction),
    Usage(&'static str),
}

impl Command {
    pub fn parse(input: &str, actions: &ActionGroup) -> Option<Self> {
        let mut words = input.split_whitespace();
        let head = words.next()?;
        if !head.starts_with('/') {
            return None;
        }

        match head {
            "/help" => Some(Command::Help),
            "/quit" | "/exit" => Some(Command::Quit),
            "/tabs" => Some(Command::Tabs),
            "/switch" => match words.next().and_then(|n| n.parse().ok()) {
                Some(index) => Some(Command::Switch(index)),
                None => Some(Command::Usage("/switch N")),
            },
            other => actions.find_by_command(other).map(Command::Action),
        }
    }
}

pub fn handle_command(command: Command, window: &mut ReplToolWindow) -> Result<String> {
    match command {
        Command::Help => Ok(format_help(window.action_group())),
        Command::Quit => Ok("Goodbye!".to_string()),
        Command::Tabs => Ok(format_tabs(window)),
        Command::Switch(index) => {
            if window.select_repl(index) {
                Ok(format!("Switched to {}", window.tab_titles()[index]))
            } else {
                Ok(format!("No REPL tab {}", index))
            }
        }
        Command::Action(action) => Ok(perform_action(action, window)),
        Command::Usage(usage) => Ok(format!("Usage: {}", usage)),
    }
}

fn perform_action(action: ReplAction, window: &mut ReplToolWindow) -> String {
    let before = window.tab_titles().len();
    window.perform(action);

    match action {
        ReplAction::Create if window.tab_titles().len() > before => {
            format!("Opened {}", window.tab_titles()[before])
        }
        ReplAction::Create => message("config.error.replNotConfiguredTitle"),
        ReplAction::Remove if window.tab_titles().len() < before => "REPL closed".to_string(),
        ReplAction::Remove => message("repl.noneOpen"),
        ReplAction::Rename => match window.selected_index() {
            Some(index) => format!("Current tab: {}", window.tab_titles()[index]),
            None => message("repl.noneOpen"),
        },
    }
}

fn format_help(actions: &ActionGroup) -> String {
    let mut output = String::from("Available commands:\n");
    for action in actions.actions() {
        output.push_str(&format!("  {:<10} - {}\n", action.command(), action.text()));
    }
    output.push_str(
        "  /tabs      - List open REPLs\n\
         \x20 /switch N  - Select REPL tab N\n\
         \x20 /help      - Show this help message\n\
         \x20 /quit      - Exit\n\
         \n\
         Anything else is evaluated in the current REPL.",
    );
    output
}

fn format_tabs(window: &ReplToolWindow) -> String {
    if window.sessions().is_empty() {
        return message("repl.noneOpen");
    }

    let mut output = String::from("Open REPLs:\n");
    for (i, (title, session)) in window
        .tab_titles()
        .iter()
        .zip(window.sessions())
        .enumerate()
    {
        let marker = if Some(i) == window.selected_index() { '*' } else { ' ' };
        output.push_str(&format!(
            "{} {}. {} ({}, opened {})\n",
            marker,
            i,
            title,
            session.url(),
            session.created_at().format("%H:%M:%S")
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let actions = ActionGroup::repl_actions();
        assert_eq!(Command::parse("/help", &actions), Some(Command::Help));
        assert_eq!(Command::parse("/exit", &actions), Some(Command::Quit));
        assert_eq!(Command::parse("/switch 2", &actions), Some(Command::Switch(2)));
        assert_eq!(
            Command::parse("/switch x", &actions),
            Some(Command::Usage("/switch N"))
        );
        assert_eq!(
            Command::parse("/new", &actions),
            Some(Command::Action(ReplAction::Create))
        );
        assert_eq!(Command::parse("/bogus", &actions), None);
    }

    #[test]
    fn test_code_is_not_a_command() {
        let actions = ActionGroup::repl_actions();
        assert_eq!(Command::parse("(+ 1 2)", &actions), None);
        assert_eq!(Command::parse("", &actions), None);
    }

    #[test]
    fn test_help_lists_actions() {
        let help = format_help(&ActionGroup::repl_actions());
        assert!(help.contains("/new"));
        assert!(help.contains("/rename"));
        assert!(help.contains("/switch N"));
    }
}
