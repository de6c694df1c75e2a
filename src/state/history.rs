//! Undo/Redo History
//!
//! Patch-based history. Each entry stores only the new values of the fields
//! an edit changed. Undo reconstructs the previous value of every field in
//! the entry by scanning earlier entries backward for the most recent one
//! that touched it, falling back to the baseline (the full field values of
//! the project the log starts from). Redo re-applies the entry directly.
//!
//! When the log grows past its limit, the oldest entry is folded into the
//! baseline, which leaves every reachable undo result unchanged.

use chrono::{DateTime, Utc};
use log::debug;

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::state::patch::ProjectPatch;
use crate::state::project::Project;

/// One recorded edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub patch: ProjectPatch,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Linear undo/redo log with a cursor.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,

    /// Number of entries currently applied to the project.
    applied: usize,

    /// Field values before the first entry.
    baseline: ProjectPatch,

    max_entries: usize,
}

impl HistoryManager {
    /// Create an empty history rooted at `baseline`.
    pub fn new(baseline: &Project, max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            baseline: ProjectPatch::full(baseline),
            max_entries: max_entries.max(1),
        }
    }

    /// Drop every entry and rebase on `baseline`.
    pub fn reset(&mut self, baseline: &Project) {
        self.entries.clear();
        self.applied = 0;
        self.baseline = ProjectPatch::full(baseline);
    }

    /// Record an edit. Entries after the cursor are discarded first.
    /// An empty patch records nothing.
    pub fn record(&mut self, patch: ProjectPatch, description: impl Into<String>) {
        if patch.is_empty() {
            return;
        }

        self.entries.truncate(self.applied);
        self.entries.push(HistoryEntry {
            patch,
            timestamp: Utc::now(),
            description: description.into(),
        });
        self.applied = self.entries.len();
        self.trim_history();
    }

    /// Step back one entry. Returns the undone entry's description, or
    /// `None` when nothing is applied.
    pub fn undo(&mut self, project: &mut Project) -> Option<String> {
        let index = self.applied.checked_sub(1)?;
        let entry = &self.entries[index];

        let mut restore = ProjectPatch::new();
        for field in entry.patch.fields() {
            let previous = self.entries[..index]
                .iter()
                .rev()
                .find_map(|earlier| earlier.patch.get(field))
                .or_else(|| self.baseline.get(field));
            if let Some(value) = previous {
                restore.insert(value.clone());
            }
        }
        restore.apply(project);

        self.applied = index;
        debug!("Undo '{}' ({} fields)", entry.description, restore.len());
        Some(entry.description.clone())
    }

    /// Re-apply the next entry. Returns its description, or `None` at the tip.
    pub fn redo(&mut self, project: &mut Project) -> Option<String> {
        let entry = self.entries.get(self.applied)?;
        entry.patch.apply(project);
        self.applied += 1;
        debug!("Redo '{}'", entry.description);
        Some(entry.description.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Number of applied entries.
    pub fn position(&self) -> usize {
        self.applied
    }

    /// Index of the last applied entry, -1 when none is applied.
    pub fn history_index(&self) -> isize {
        self.applied as isize - 1
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Fold the oldest applied entries into the baseline until the log fits.
    fn trim_history(&mut self) {
        while self.entries.len() > self.max_entries && self.applied > 0 {
            let oldest = self.entries.remove(0);
            self.baseline.merge(&oldest.patch);
            self.applied -= 1;
        }
    }
}

/// History rooted at an empty project, so the first edit of any field can
/// be undone back to its default value.
impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(&Project::new(String::new(), Utc::now()), DEFAULT_HISTORY_LIMIT)
    }
}
