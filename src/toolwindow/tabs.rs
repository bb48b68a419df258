// Tab bar state for the REPL tool window

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabPlacement {
    Top,
    Bottom,
}

/// Ordered tab titles plus the selection.
///
/// Closing the selected tab goes back to the most recently selected tab
/// that still exists, so opening and immediately closing a tab leaves the
/// bar as it was.
#[derive(Debug, Clone)]
pub struct TabBar {
    placement: TabPlacement,
    titles: Vec<String>,
    selected: Option<usize>,
    history: Vec<usize>,
}

impl TabBar {
    pub fn new(placement: TabPlacement) -> Self {
        Self {
            placement,
            titles: Vec::new(),
            selected: None,
            history: Vec::new(),
        }
    }

    pub fn placement(&self) -> TabPlacement {
        self.placement
    }

    pub fn tab_count(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn title_at(&self, index: usize) -> Option<&str> {
        self.titles.get(index).map(String::as_str)
    }

    pub fn set_title_at(&mut self, index: usize, title: impl Into<String>) -> bool {
        match self.titles.get_mut(index) {
            Some(slot) => {
                *slot = title.into();
                true
            }
            None => false,
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Append a tab and return its index. The first tab is selected automatically.
    pub fn add_tab(&mut self, title: impl Into<String>) -> usize {
        self.titles.push(title.into());
        let index = self.titles.len() - 1;
        if self.selected.is_none() {
            self.set_selected_index(index);
        }
        index
    }

    pub fn set_selected_index(&mut self, index: usize) -> bool {
        if index >= self.titles.len() {
            return false;
        }
        if let Some(previous) = self.selected {
            if previous != index {
                self.history.retain(|&i| i != previous);
                self.history.push(previous);
            }
        }
        self.history.retain(|&i| i != index);
        self.selected = Some(index);
        true
    }

    pub fn remove_tab_at(&mut self, index: usize) -> Option<String> {
        if index >= self.titles.len() {
            return None;
        }
        let title = self.titles.remove(index);

        self.history.retain(|&i| i != index);
        for i in self.history.iter_mut() {
            if *i > index {
                *i -= 1;
            }
        }

        let current = self.selected;
        self.selected = match current {
            _ if self.titles.is_empty() => None,
            Some(s) if s == index => Some(
                self.history
                    .pop()
                    .unwrap_or_else(|| index.min(self.titles.len() - 1)),
            ),
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        if self.titles.is_empty() {
            self.history.clear();
        }
        Some(title)
    }

    pub fn clear(&mut self) {
        self.titles.clear();
        self.history.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(titles: &[&str]) -> TabBar {
        let mut bar = TabBar::new(TabPlacement::Bottom);
        for t in titles {
            bar.add_tab(*t);
        }
        bar
    }

    #[test]
    fn test_first_tab_selected() {
        let bar = bar(&["a", "b"]);
        assert_eq!(bar.selected_index(), Some(0));
        assert_eq!(bar.tab_count(), 2);
    }

    #[test]
    fn test_add_then_remove_restores_selection() {
        let mut bar = bar(&["a", "b", "c"]);
        bar.set_selected_index(0);

        let idx = bar.add_tab("d");
        bar.set_selected_index(idx);
        bar.remove_tab_at(idx);

        assert_eq!(bar.titles(), ["a", "b", "c"]);
        assert_eq!(bar.selected_index(), Some(0));
    }

    #[test]
    fn test_remove_before_selection_shifts_it() {
        let mut bar = bar(&["a", "b", "c"]);
        bar.set_selected_index(2);
        bar.remove_tab_at(0);
        assert_eq!(bar.selected_index(), Some(1));
        assert_eq!(bar.title_at(1), Some("c"));
    }

    #[test]
    fn test_remove_last_tab_clears_selection() {
        let mut bar = bar(&["a"]);
        assert_eq!(bar.remove_tab_at(0).as_deref(), Some("a"));
        assert_eq!(bar.selected_index(), None);
        assert!(bar.remove_tab_at(0).is_none());
    }

    #[test]
    fn test_remove_selected_without_history_picks_neighbour() {
        let mut bar = bar(&["a", "b", "c"]);
        // only "a" was ever selected
        bar.remove_tab_at(0);
        assert_eq!(bar.selected_index(), Some(0));
        assert_eq!(bar.title_at(0), Some("b"));
    }

    #[test]
    fn test_rename() {
        let mut bar = bar(&["a"]);
        assert!(bar.set_title_at(0, "main"));
        assert!(!bar.set_title_at(3, "x"));
        assert_eq!(bar.title_at(0), Some("main"));
    }
}
