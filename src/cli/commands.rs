//! CLI Command Implementations
//!
//! Every command opens the project through a [`PersistenceCoordinator`]
//! backed by a [`FileStore`], so edits are saved the same way the editor
//! saves them.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::{ClipdeckError, Result};
use crate::persistence::{
    FileStore, LoadSource, MemoryRemoteStore, PersistenceCoordinator, SaveStatus, SessionAuth,
};
use crate::state::{load_snapshot, Project};
use crate::store::{Action, ProjectStore};
use crate::timeline::Marker;

/// Loaded configuration plus the coordinator for the chosen store directory.
pub struct Workspace {
    config: EditorConfig,
    coordinator: PersistenceCoordinator,
}

impl Workspace {
    /// Open the store at `store_dir` with the configuration at `config_path`
    /// (defaults when absent).
    pub fn open(store_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = EditorConfig::load_or_default(config_path)?;
        let local = FileStore::open(store_dir)?;
        debug!("Local store at {}", local.dir().display());
        let coordinator = PersistenceCoordinator::new(
            config.persistence.clone(),
            Arc::new(local),
            Arc::new(MemoryRemoteStore::new()),
            Arc::new(SessionAuth::new()),
        );
        Ok(Self {
            config,
            coordinator,
        })
    }

    /// The stored project (or a fresh one), with saving attached.
    async fn load(&self) -> Result<ProjectStore> {
        let outcome = self.coordinator.restore().await;
        if outcome.source == LoadSource::Default {
            info!("No stored project, starting a new one");
        }
        let mut store = outcome.into_store(&self.config.history)?;
        self.coordinator.observe(&mut store);
        Ok(store)
    }

    fn ensure_saved(&self) -> Result<()> {
        match self.coordinator.status().save_status {
            SaveStatus::Error => Err(ClipdeckError::LocalWriteRejected {
                key: self.config.persistence.local_key.clone(),
                reason: "see log for details".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Start a fresh project, replacing the stored one.
pub async fn new_project(workspace: &Workspace, name: Option<&str>) -> Result<()> {
    let mut store = ProjectStore::new(&workspace.config.history);
    workspace.coordinator.observe(&mut store);

    // A rename saves through the subscription; otherwise save explicitly.
    let renamed = name.is_some_and(|name| store.set_name(name));
    if !renamed {
        workspace.coordinator.on_project_changed(store.project());
    }
    workspace.ensure_saved()?;

    println!("Project created: {} ({})", store.project().name, store.project().id);
    Ok(())
}

/// Print the stored project.
pub async fn show(workspace: &Workspace, json: bool) -> Result<()> {
    let store = workspace.load().await?;
    let project = store.project();

    if json {
        println!("{}", serde_json::to_string_pretty(project)?);
        return Ok(());
    }

    print_summary(project);
    Ok(())
}

/// Apply a JSON array of actions, stopping at the first rejected one.
pub async fn apply(workspace: &Workspace, actions_path: &Path) -> Result<()> {
    let raw = fs::read_to_string(actions_path).map_err(|e| ClipdeckError::FileReadError {
        path: actions_path.to_path_buf(),
        source: e,
    })?;
    let actions: Vec<Action> = serde_json::from_str(&raw)?;
    info!("Applying {} actions from {}", actions.len(), actions_path.display());

    let mut store = workspace.load().await?;
    let total = actions.len();
    for (index, action) in actions.into_iter().enumerate() {
        match store.dispatch(action) {
            Ok(Some(id)) => println!("[{}/{}] created {}", index + 1, total, id),
            Ok(None) => println!("[{}/{}] ok", index + 1, total),
            Err(e) => {
                warn!("Action {} rejected: {}", index + 1, e);
                workspace.ensure_saved()?;
                return Err(e);
            }
        }
    }
    workspace.ensure_saved()?;

    println!("Applied {} actions to {}", total, store.project().id);
    Ok(())
}

/// Replace the stored project with the project in `file`.
pub async fn import(workspace: &Workspace, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file).map_err(|e| ClipdeckError::FileReadError {
        path: file.to_path_buf(),
        source: e,
    })?;
    let project = load_snapshot(serde_json::from_str(&raw)?)?;

    let mut store = workspace.load().await?;
    store.import_project(project)?;
    workspace.ensure_saved()?;

    println!("Imported: {} ({})", store.project().name, store.project().id);
    Ok(())
}

/// Write the stored project to `file`.
pub async fn export(workspace: &Workspace, file: &Path) -> Result<()> {
    let store = workspace.load().await?;
    let json = serde_json::to_string_pretty(&store.export_project())?;
    fs::write(file, json).map_err(|e| ClipdeckError::FileWriteError {
        path: file.to_path_buf(),
        source: e,
    })?;

    println!("Exported: {}", file.display());
    Ok(())
}

/// List clips overlapping `[start, end]` in render order.
pub async fn range(workspace: &Workspace, start: f64, end: f64) -> Result<()> {
    let store = workspace.load().await?;
    let mut clips = store.clips_in_range(start, end)?;
    let markers = store.markers_in_range(start, end)?;

    if clips.is_empty() {
        println!("No clips between {:.2}s and {:.2}s.", start, end);
        print_markers(&markers);
        return Ok(());
    }

    clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    println!("{:<8} {:<36} {:>9} {:>9}", "KIND", "ID", "START", "END");
    println!("{:-<65}", "");
    for clip in clips {
        let end = clip
            .end_time
            .map(|end| format!("{:.2}", end))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<36} {:>9.2} {:>9}",
            clip.kind(),
            clip.id,
            clip.start_time,
            end
        );
    }
    print_markers(&markers);
    Ok(())
}

fn print_markers(markers: &[&Marker]) {
    if markers.is_empty() {
        return;
    }
    println!("Markers:");
    for marker in markers {
        let label = marker.label.as_deref().unwrap_or("-");
        let kind = if marker.is_beat() { "beat" } else { "section" };
        println!(
            "  {:<8} {:>9.2} {:>9.2} {}",
            kind,
            marker.start(),
            marker.end(),
            label
        );
    }
}

fn print_summary(project: &Project) {
    println!("Project: {} ({})", project.name, project.id);
    println!("Schema version: {}", project.schema_version);
    println!("Last modified: {}", project.last_modified);
    println!("{:-<60}", "");
    println!("Duration: {:.2}s | Timeline end: {:.2}s", project.duration, project.timeline_end());
    println!("Tracks: {}", project.tracks.len());
    println!(
        "Clips: {} audio, {} video, {} text",
        project.clips.audio_tracks().count(),
        project.clips.video_clips().count(),
        project.clips.text_elements().count()
    );
    println!(
        "Effects: {} | Markers: {} | Assets: {}",
        project.effects.len(),
        project.markers.len(),
        project.assets.len()
    );
    println!(
        "Prompts: {} | Transcriptions: {}",
        project.prompts.len(),
        project.transcriptions.len()
    );
    println!(
        "Workflow: step {} | completed {:?}",
        project.workflow.current_step,
        project.workflow.completed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_new_then_export() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(&dir.path().join("store"), None).unwrap();

        new_project(&workspace, Some("Demo")).await.unwrap();

        let out = dir.path().join("out.json");
        export(&workspace, &out).await.unwrap();
        let exported: Project =
            load_snapshot(serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap())
                .unwrap();
        assert_eq!(exported.name, "Demo");
    }

    #[tokio::test]
    async fn test_apply_persists_actions() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        let actions = dir.path().join("actions.json");
        fs::write(
            &actions,
            r#"[
                {"project": {"setName": "Applied"}},
                {"workflow": {"markCompleted": 2}}
            ]"#,
        )
        .unwrap();

        apply(&workspace, &actions).await.unwrap();

        let store = workspace.load().await.unwrap();
        assert_eq!(store.project().name, "Applied");
        assert_eq!(store.completed_steps(), vec![2]);
    }

    #[tokio::test]
    async fn test_range_rejects_inverted_bounds() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        let err = range(&workspace, 5.0, 1.0).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TIME_RANGE");
    }
}
