//! Selected element ids.

use serde::{Deserialize, Serialize};

use crate::state::Project;

/// Ordered, duplicate-free set of selected entity ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id`. Without `additive` the previous selection is replaced.
    /// Returns true if the selection changed.
    pub fn select(&mut self, id: &str, additive: bool) -> bool {
        let before = self.ids.clone();
        if !additive {
            self.ids.clear();
        }
        if !self.ids.iter().any(|selected| selected == id) {
            self.ids.push(id.to_string());
        }
        self.ids != before
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        let len = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != len
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Most recently selected id.
    pub fn primary(&self) -> Option<&str> {
        self.ids.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop ids that no longer exist in `project`.
    pub fn prune(&mut self, project: &Project) -> bool {
        let existing = project.entity_ids();
        let len = self.ids.len();
        self.ids.retain(|id| existing.contains(id.as_str()));
        self.ids.len() != len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_select_replaces_unless_additive() {
        let mut selection = Selection::new();
        assert!(selection.select("a", false));
        assert!(selection.select("b", true));
        assert_eq!(selection.ids(), ["a", "b"]);

        assert!(!selection.select("b", true));
        assert!(selection.select("c", false));
        assert_eq!(selection.ids(), ["c"]);
        assert_eq!(selection.primary(), Some("c"));
    }

    #[test]
    fn test_deselect_and_clear() {
        let mut selection = Selection::new();
        selection.select("a", true);
        selection.select("b", true);
        assert!(selection.deselect("a"));
        assert!(!selection.deselect("a"));
        assert!(selection.clear());
        assert!(!selection.clear());
    }

    #[test]
    fn test_prune_drops_missing_ids() {
        let project = Project::new("p", Utc::now());
        let mut selection = Selection::new();
        selection.select("ghost", false);
        assert!(selection.prune(&project));
        assert!(selection.is_empty());
    }
}
