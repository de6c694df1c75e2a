//! Field-level project patches.
//!
//! A patch holds owned copies of the new values of the top-level project
//! fields one edit changed. `id`, the schema version and timestamps are
//! never part of a patch.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::state::project::Project;
use crate::state::workflow::WorkflowData;
use crate::timeline::{Asset, ClipStore, Effect, Marker, Prompt, Track, Transcription};

/// A top-level project field that history tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectField {
    Name,
    Duration,
    Tracks,
    Clips,
    Effects,
    Markers,
    Assets,
    Prompts,
    Transcriptions,
    CurrentStep,
    CompletedSteps,
    WorkflowData,
}

impl ProjectField {
    /// Every field that history tracks. Id, schema version and timestamps
    /// are not among them.
    pub const ALL: [ProjectField; 12] = [
        ProjectField::Name,
        ProjectField::Duration,
        ProjectField::Tracks,
        ProjectField::Clips,
        ProjectField::Effects,
        ProjectField::Markers,
        ProjectField::Assets,
        ProjectField::Prompts,
        ProjectField::Transcriptions,
        ProjectField::CurrentStep,
        ProjectField::CompletedSteps,
        ProjectField::WorkflowData,
    ];

    /// Key of the field in the serialized project.
    pub fn key(self) -> &'static str {
        match self {
            ProjectField::Name => "name",
            ProjectField::Duration => "duration",
            ProjectField::Tracks => "tracks",
            ProjectField::Clips => "clips",
            ProjectField::Effects => "effects",
            ProjectField::Markers => "markers",
            ProjectField::Assets => "assets",
            ProjectField::Prompts => "prompts",
            ProjectField::Transcriptions => "transcriptions",
            ProjectField::CurrentStep => "currentStep",
            ProjectField::CompletedSteps => "completedSteps",
            ProjectField::WorkflowData => "workflowData",
        }
    }
}

/// Owned value of one [`ProjectField`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Name(String),
    Duration(f64),
    Tracks(Vec<Track>),
    Clips(ClipStore),
    Effects(Vec<Effect>),
    Markers(Vec<Marker>),
    Assets(Vec<Asset>),
    Prompts(Vec<Prompt>),
    Transcriptions(Vec<Transcription>),
    CurrentStep(u32),
    CompletedSteps(BTreeSet<u32>),
    WorkflowData(WorkflowData),
}

impl FieldValue {
    pub fn field(&self) -> ProjectField {
        match self {
            FieldValue::Name(_) => ProjectField::Name,
            FieldValue::Duration(_) => ProjectField::Duration,
            FieldValue::Tracks(_) => ProjectField::Tracks,
            FieldValue::Clips(_) => ProjectField::Clips,
            FieldValue::Effects(_) => ProjectField::Effects,
            FieldValue::Markers(_) => ProjectField::Markers,
            FieldValue::Assets(_) => ProjectField::Assets,
            FieldValue::Prompts(_) => ProjectField::Prompts,
            FieldValue::Transcriptions(_) => ProjectField::Transcriptions,
            FieldValue::CurrentStep(_) => ProjectField::CurrentStep,
            FieldValue::CompletedSteps(_) => ProjectField::CompletedSteps,
            FieldValue::WorkflowData(_) => ProjectField::WorkflowData,
        }
    }

    /// Copy `field` out of `project`.
    pub fn read(project: &Project, field: ProjectField) -> Self {
        match field {
            ProjectField::Name => FieldValue::Name(project.name.clone()),
            ProjectField::Duration => FieldValue::Duration(project.duration),
            ProjectField::Tracks => FieldValue::Tracks(project.tracks.clone()),
            ProjectField::Clips => FieldValue::Clips(project.clips.clone()),
            ProjectField::Effects => FieldValue::Effects(project.effects.clone()),
            ProjectField::Markers => FieldValue::Markers(project.markers.clone()),
            ProjectField::Assets => FieldValue::Assets(project.assets.clone()),
            ProjectField::Prompts => FieldValue::Prompts(project.prompts.clone()),
            ProjectField::Transcriptions => {
                FieldValue::Transcriptions(project.transcriptions.clone())
            }
            ProjectField::CurrentStep => FieldValue::CurrentStep(project.workflow.current_step),
            ProjectField::CompletedSteps => {
                FieldValue::CompletedSteps(project.workflow.completed_steps.clone())
            }
            ProjectField::WorkflowData => FieldValue::WorkflowData(project.workflow_data.clone()),
        }
    }

    /// Write the value into `project`.
    pub fn write(&self, project: &mut Project) {
        match self {
            FieldValue::Name(v) => project.name = v.clone(),
            FieldValue::Duration(v) => project.duration = *v,
            FieldValue::Tracks(v) => project.tracks = v.clone(),
            FieldValue::Clips(v) => project.clips = v.clone(),
            FieldValue::Effects(v) => project.effects = v.clone(),
            FieldValue::Markers(v) => project.markers = v.clone(),
            FieldValue::Assets(v) => project.assets = v.clone(),
            FieldValue::Prompts(v) => project.prompts = v.clone(),
            FieldValue::Transcriptions(v) => project.transcriptions = v.clone(),
            FieldValue::CurrentStep(v) => project.workflow.current_step = *v,
            FieldValue::CompletedSteps(v) => project.workflow.completed_steps = v.clone(),
            FieldValue::WorkflowData(v) => project.workflow_data = v.clone(),
        }
    }
}

/// Whether `field` differs between two projects.
fn field_differs(a: &Project, b: &Project, field: ProjectField) -> bool {
    match field {
        ProjectField::Name => a.name != b.name,
        ProjectField::Duration => a.duration != b.duration,
        ProjectField::Tracks => a.tracks != b.tracks,
        ProjectField::Clips => a.clips != b.clips,
        ProjectField::Effects => a.effects != b.effects,
        ProjectField::Markers => a.markers != b.markers,
        ProjectField::Assets => a.assets != b.assets,
        ProjectField::Prompts => a.prompts != b.prompts,
        ProjectField::Transcriptions => a.transcriptions != b.transcriptions,
        ProjectField::CurrentStep => a.workflow.current_step != b.workflow.current_step,
        ProjectField::CompletedSteps => a.workflow.completed_steps != b.workflow.completed_steps,
        ProjectField::WorkflowData => a.workflow_data != b.workflow_data,
    }
}

/// Changed fields with their new values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    values: BTreeMap<ProjectField, FieldValue>,
}

impl ProjectPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tracked field of `project`.
    pub fn full(project: &Project) -> Self {
        Self::capture(project, ProjectField::ALL)
    }

    /// The given fields of `project`.
    pub fn capture<I>(project: &Project, fields: I) -> Self
    where
        I: IntoIterator<Item = ProjectField>,
    {
        let values = fields
            .into_iter()
            .map(|field| (field, FieldValue::read(project, field)))
            .collect();
        Self { values }
    }

    /// Fields that differ between `before` and `after`, valued from `after`.
    pub fn diff(before: &Project, after: &Project) -> Self {
        let changed = ProjectField::ALL
            .into_iter()
            .filter(|field| field_differs(before, after, *field));
        Self::capture(after, changed)
    }

    pub fn insert(&mut self, value: FieldValue) {
        self.values.insert(value.field(), value);
    }

    pub fn get(&self, field: ProjectField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Fields carried by the patch, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = ProjectField> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Values<'_, ProjectField, FieldValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write every value into `project`.
    pub fn apply(&self, project: &mut Project) {
        for value in self.values.values() {
            value.write(project);
        }
    }

    /// Overlay `other` on top of this patch.
    pub fn merge(&mut self, other: &ProjectPatch) {
        for value in other.values.values() {
            self.insert(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_diff_only_changed_fields() {
        let before = Project::new("p", Utc::now());
        let mut after = before.clone();
        after.name = "Renamed".to_string();
        after.workflow.mark_completed(1);

        let patch = ProjectPatch::diff(&before, &after);
        let fields: Vec<ProjectField> = patch.fields().collect();
        assert_eq!(fields, vec![ProjectField::Name, ProjectField::CompletedSteps]);
    }

    #[test]
    fn test_apply_restores_values() {
        let original = Project::new("p", Utc::now());
        let baseline = ProjectPatch::full(&original);

        let mut edited = original.clone();
        edited.name = "Changed".to_string();
        edited.duration = 30.0;
        baseline.apply(&mut edited);

        assert_eq!(edited, original);
    }

    #[test]
    fn test_merge_overrides() {
        let project = Project::new("p", Utc::now());
        let mut base = ProjectPatch::full(&project);
        let mut newer = ProjectPatch::new();
        newer.insert(FieldValue::Duration(12.0));
        base.merge(&newer);
        assert_eq!(base.get(ProjectField::Duration), Some(&FieldValue::Duration(12.0)));
        assert_eq!(base.len(), ProjectField::ALL.len());
    }

    #[test]
    fn test_keys_match_serialized_project() {
        let project = Project::new("p", Utc::now());
        let value = serde_json::to_value(&project).unwrap();
        for field in ProjectField::ALL {
            assert!(value.get(field.key()).is_some(), "missing {}", field.key());
        }
    }
}
