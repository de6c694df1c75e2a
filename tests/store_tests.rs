//! Integration Tests
//!
//! End-to-end editing scenarios against the project store.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use test_case::test_case;

use clipdeck::config::HistoryConfig;
use clipdeck::state::{
    load_snapshot, HistoryManager, Project, ProjectPatch, StagePayload, TranscriptSegment,
    DEFAULT_PROJECT_NAME,
};
use clipdeck::store::{Action, Change, ClipAction, ProjectStore, WorkflowAction};
use clipdeck::timeline::{
    BeatAccent, ClipPatch, EffectParams, EffectTarget, NewAudioTrack, NewEffect, NewMarker,
    NewTextElement, NewTrack, NewVideoClip, TrackKind,
};

fn audio(url: &str, start: f64) -> NewAudioTrack {
    NewAudioTrack {
        url: url.to_string(),
        start_time: start,
        ..Default::default()
    }
}

fn video(start: f64, end: f64) -> NewVideoClip {
    NewVideoClip {
        url: "shot.mp4".to_string(),
        start_time: start,
        end_time: end,
        ..Default::default()
    }
}

/// Project with `lastModified` pinned, for comparing content across undo.
fn content(project: &Project) -> Project {
    let mut project = project.clone();
    project.last_modified = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    project
}

// === Scenarios ===

#[test]
fn test_two_undos_remove_both_clips() {
    let mut store = ProjectStore::default();
    store.add_audio_track(audio("a.mp3", 0.0)).unwrap();
    store.add_video_clip(video(0.0, 5.0)).unwrap();

    assert!(store.undo());
    assert!(store.undo());

    assert_eq!(store.project().clips.audio_tracks().count(), 0);
    assert_eq!(store.project().clips.video_clips().count(), 0);
    assert!(!store.can_undo());
    assert!(store.can_redo());
}

#[test]
fn test_completed_steps_sorted() {
    let mut store = ProjectStore::default();
    store.mark_step_completed(2);
    store.mark_step_completed(0);
    assert_eq!(store.completed_steps(), vec![0, 2]);
}

#[test]
fn test_complete_then_incomplete() {
    let mut store = ProjectStore::default();
    store.mark_step_completed(1);
    store.mark_step_incomplete(1);
    assert_eq!(store.completed_steps(), Vec::<u32>::new());
    assert!(!store.is_step_completed(1));
}

// === Round trip ===

#[test]
fn test_import_of_export_is_identical() {
    let mut store = ProjectStore::default();
    let track = store
        .add_track(NewTrack {
            name: "Main".to_string(),
            kind: TrackKind::Video,
            color: None,
        })
        .unwrap();
    let clip = store
        .add_video_clip(NewVideoClip {
            track_id: Some(track),
            ..video(1.0, 4.0)
        })
        .unwrap();
    store
        .add_effect(NewEffect {
            target: EffectTarget::Clip(clip),
            start_time: 1.0,
            duration: 2.0,
            params: EffectParams::Blur { radius: 3.0 },
        })
        .unwrap();
    store
        .add_marker(NewMarker::beat(0.5, 0.8, BeatAccent::Downbeat))
        .unwrap();
    store.mark_step_completed(3);
    store.set_name("Round trip");

    let exported = store.export_project();

    let mut other = ProjectStore::default();
    other.import_project(exported.clone()).unwrap();
    assert_eq!(other.export_project(), exported);

    let json = serde_json::to_value(&exported).unwrap();
    assert_eq!(load_snapshot(json).unwrap(), exported);
}

#[test]
fn test_workflow_data_survives_export_import() {
    let mut store = ProjectStore::default();
    store
        .update_workflow_data(
            1,
            StagePayload::Transcription {
                text: "la la la".to_string(),
                segments: vec![TranscriptSegment {
                    start: 0.0,
                    end: 2.5,
                    text: "la la".to_string(),
                }],
            },
        )
        .unwrap();
    store
        .update_workflow_data(
            3,
            StagePayload::Style {
                style: "noir".to_string(),
                mood: Some("tense".to_string()),
                color_palette: vec!["#000000".to_string(), "#ffffff".to_string()],
            },
        )
        .unwrap();

    let json = serde_json::to_value(store.export_project()).unwrap();
    assert!(json["workflowData"]["1"].is_object());

    let mut other = ProjectStore::default();
    other.import_project(load_snapshot(json).unwrap()).unwrap();
    assert_eq!(other.project().workflow_data, store.project().workflow_data);
    assert_eq!(other.project().workflow_data.len(), 2);
}

/// Serialized project with one video clip on one track.
fn clip_project_json() -> serde_json::Value {
    let mut store = ProjectStore::default();
    let track = store
        .add_track(NewTrack {
            name: "Main".to_string(),
            kind: TrackKind::Video,
            color: None,
        })
        .unwrap();
    store
        .add_video_clip(NewVideoClip {
            track_id: Some(track),
            ..video(0.0, 3.0)
        })
        .unwrap();
    serde_json::to_value(store.export_project()).unwrap()
}

#[test]
fn test_import_rejects_duplicate_clip_id() {
    let mut json = clip_project_json();
    let clips = json["clips"].as_array_mut().unwrap();
    let copy = clips[0].clone();
    clips.push(copy);
    let project: Project = serde_json::from_value(json).unwrap();

    let mut store = ProjectStore::default();
    let before = store.export_project();
    let err = store.import_project(project).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");
    assert_eq!(store.export_project(), before);
}

#[test]
fn test_import_rejects_dangling_track_id() {
    let mut json = clip_project_json();
    json["clips"][0]["trackId"] = serde_json::Value::from("track-missing");
    let project: Project = serde_json::from_value(json).unwrap();

    let mut store = ProjectStore::default();
    let before = store.export_project();
    assert!(store.import_project(project).is_err());
    assert_eq!(store.export_project(), before);
}

#[test]
fn test_import_rejects_dangling_effect_target() {
    let mut store = ProjectStore::default();
    let clip = store.add_video_clip(video(0.0, 3.0)).unwrap();
    store
        .add_effect(NewEffect {
            target: EffectTarget::Clip(clip),
            start_time: 0.0,
            duration: 1.0,
            params: EffectParams::Blur { radius: 2.0 },
        })
        .unwrap();
    // Drop the clip but keep the effect pointing at it.
    let mut json = serde_json::to_value(store.export_project()).unwrap();
    json["clips"] = serde_json::json!([]);
    let project: Project = serde_json::from_value(json).unwrap();

    let mut other = ProjectStore::default();
    assert!(other.import_project(project).is_err());
}

#[test]
fn test_import_resets_history() {
    let mut store = ProjectStore::default();
    store.set_name("Before");
    let mut other = ProjectStore::default();
    other.set_name("Imported");

    store.import_project(other.export_project()).unwrap();
    assert_eq!(store.project().name, "Imported");
    assert!(!store.can_undo());
    assert!(!store.undo());
}

// === Undo / redo ===

#[test]
fn test_undo_redo_inverse_over_many_edits() {
    let mut store = ProjectStore::new(&HistoryConfig::default());
    let mut snapshots = vec![content(store.project())];

    store.set_name("Clip show");
    snapshots.push(content(store.project()));
    store.set_duration(30.0).unwrap();
    snapshots.push(content(store.project()));
    let first = store.add_audio_track(audio("a.mp3", 0.0)).unwrap();
    snapshots.push(content(store.project()));
    store.add_video_clip(video(2.0, 6.0)).unwrap();
    snapshots.push(content(store.project()));
    store
        .add_text_element(NewTextElement {
            text: "Hello".to_string(),
            start_time: 0.0,
            end_time: 3.0,
            ..Default::default()
        })
        .unwrap();
    snapshots.push(content(store.project()));
    store
        .update_audio_track(
            &first,
            &ClipPatch {
                start_time: Some(1.5),
                ..Default::default()
            },
        )
        .unwrap();
    snapshots.push(content(store.project()));
    store.mark_step_completed(4);
    snapshots.push(content(store.project()));
    assert!(store.remove_audio_track(&first));
    snapshots.push(content(store.project()));

    let edits = snapshots.len() - 1;
    for expected in snapshots.iter().rev().skip(1) {
        assert!(store.undo());
        assert_eq!(&content(store.project()), expected);
    }
    assert!(!store.undo());

    for expected in snapshots.iter().skip(1) {
        assert!(store.redo());
        assert_eq!(&content(store.project()), expected);
    }
    assert!(!store.redo());
    assert_eq!(store.history().len(), edits);
}

#[test]
fn test_edit_after_undo_discards_redo() {
    let mut store = ProjectStore::default();
    store.set_name("One");
    store.set_name("Two");
    store.undo();
    store.set_name("Three");

    assert!(!store.can_redo());
    assert!(store.undo());
    assert_eq!(store.project().name, "One");
}

#[test]
fn test_history_limit_keeps_undo_to_baseline() {
    let mut store = ProjectStore::new(&HistoryConfig { max_entries: 3 });
    for i in 0..6 {
        store.set_name(format!("Name {}", i));
    }
    assert_eq!(store.history().len(), 3);
    assert_eq!(store.history().max_entries(), 3);

    while store.undo() {}
    assert_eq!(store.project().name, "Name 2");
}

#[test]
fn test_default_history_undoes_first_edit() {
    let mut project = Project::new("project-1", Utc::now());
    let mut history = HistoryManager::default();

    let before = project.clone();
    project.name = "A".to_string();
    history.record(ProjectPatch::diff(&before, &project), "Rename");

    assert!(history.undo(&mut project).is_some());
    assert_eq!(project.name, DEFAULT_PROJECT_NAME);
    assert!(history.undo(&mut project).is_none());
}

// === Range invariant ===

#[test_case(0.0, 5.0, true ; "ordered")]
#[test_case(5.0, 5.0, false ; "empty")]
#[test_case(6.0, 2.0, false ; "inverted")]
#[test_case(-1.0, 2.0, false ; "negative start")]
#[test_case(0.0, f64::INFINITY, false ; "infinite end")]
fn test_video_clip_range(start: f64, end: f64, accepted: bool) {
    let mut store = ProjectStore::default();
    assert_eq!(store.add_video_clip(video(start, end)).is_ok(), accepted);
}

#[test]
fn test_video_clips_stay_ordered_after_updates() {
    let mut store = ProjectStore::default();
    let id = store.add_video_clip(video(1.0, 4.0)).unwrap();

    let attempts = [
        (Some(5.0), None),
        (None, Some(0.5)),
        (Some(2.0), Some(3.0)),
        (Some(3.0), Some(3.0)),
        (None, Some(9.0)),
    ];
    for (start_time, end_time) in attempts {
        let _ = store.update_video_clip(
            &id,
            &ClipPatch {
                start_time,
                end_time,
                ..Default::default()
            },
        );
        for clip in store.project().clips.video_clips() {
            assert!(clip.start_time < clip.end());
        }
    }

    let clip = store.project().clips.get(&id).unwrap();
    assert_eq!((clip.start_time, clip.end_time), (2.0, Some(9.0)));
}

#[test]
fn test_range_query() {
    let mut store = ProjectStore::default();
    store.add_video_clip(video(0.0, 2.0)).unwrap();
    let middle = store.add_video_clip(video(3.0, 5.0)).unwrap();
    store.add_video_clip(video(8.0, 9.0)).unwrap();

    let found: Vec<&str> = store
        .clips_in_range(4.0, 6.0)
        .unwrap()
        .into_iter()
        .map(|clip| clip.id.as_str())
        .collect();
    assert_eq!(found, vec![middle.as_str()]);
    assert!(store.clips_in_range(6.0, 4.0).is_err());
}

// === Dispatch and subscriptions ===

#[test]
fn test_dispatch_notifies_subscribers() {
    let mut store = ProjectStore::default();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.subscribe(move |event| sink.borrow_mut().push(event.change.clone()));

    let actions: Vec<Action> = serde_json::from_str(
        r#"[
            {"clip": {"addAudioTrack": {"url": "song.mp3"}}},
            {"workflow": {"markCompleted": 1}},
            "undo",
            {"session": "play"}
        ]"#,
    )
    .unwrap();
    for action in actions {
        store.dispatch(action).unwrap();
    }

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert!(matches!(seen[0], Change::Edit { .. }));
    assert!(matches!(seen[2], Change::Undo { .. }));
    assert_eq!(seen[3], Change::Session);
    assert!(!seen[3].touches_project());
}

#[test]
fn test_dispatch_rejection_leaves_project_unchanged() {
    let mut store = ProjectStore::default();
    let before = store.export_project();

    let result = store.dispatch(Action::Clip(ClipAction::AddVideoClip(video(4.0, 2.0))));
    assert!(result.is_err());
    assert_eq!(store.export_project(), before);

    store
        .dispatch(Action::Workflow(WorkflowAction::MarkCompleted(2)))
        .unwrap();
    assert_eq!(store.completed_steps(), vec![2]);
}
