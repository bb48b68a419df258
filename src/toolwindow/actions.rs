// REPL actions and the menus that expose them

use std::sync::Arc;

use super::bundle::message;

pub const REPL_ACTION_GROUP_ID: &str = "ClojureReplActionGroup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplAction {
    Create,
    Remove,
    Rename,
}

impl ReplAction {
    pub fn id(&self) -> &'static str {
        match self {
            ReplAction::Create => "Clojure.Repl.Create",
            ReplAction::Remove => "Clojure.Repl.Remove",
            ReplAction::Rename => "Clojure.Repl.Rename",
        }
    }

    pub fn text(&self) -> String {
        match self {
            ReplAction::Create => message("action.create"),
            ReplAction::Remove => message("action.remove"),
            ReplAction::Rename => message("action.rename"),
        }
    }

    /// Slash command that triggers the action from the terminal.
    pub fn command(&self) -> &'static str {
        match self {
            ReplAction::Create => "/new",
            ReplAction::Remove => "/close",
            ReplAction::Rename => "/rename",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGroup {
    id: String,
    actions: Vec<ReplAction>,
}

impl ActionGroup {
    pub fn new(id: impl Into<String>, actions: Vec<ReplAction>) -> Self {
        Self {
            id: id.into(),
            actions,
        }
    }

    /// The group shared by every REPL console and toolbar.
    pub fn repl_actions() -> Self {
        Self::new(
            REPL_ACTION_GROUP_ID,
            vec![ReplAction::Create, ReplAction::Remove, ReplAction::Rename],
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[ReplAction] {
        &self.actions
    }

    pub fn find_by_command(&self, command: &str) -> Option<ReplAction> {
        self.actions.iter().copied().find(|a| a.command() == command)
    }
}

/// Context menu built from an action group for one place in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupMenu {
    place: String,
    group: Arc<ActionGroup>,
}

impl PopupMenu {
    pub fn new(place: impl Into<String>, group: Arc<ActionGroup>) -> Self {
        Self {
            place: place.into(),
            group,
        }
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn group(&self) -> &Arc<ActionGroup> {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_group() {
        let group = ActionGroup::repl_actions();
        assert_eq!(group.id(), "ClojureReplActionGroup");
        assert_eq!(group.actions().len(), 3);
        assert_eq!(group.find_by_command("/close"), Some(ReplAction::Remove));
        assert_eq!(group.find_by_command("/quit"), None);
    }

    #[test]
    fn test_action_texts_resolve() {
        for action in ActionGroup::repl_actions().actions() {
            assert!(!action.text().starts_with('!'));
        }
    }
}
