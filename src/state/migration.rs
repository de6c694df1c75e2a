//! Schema migration for stored project snapshots.
//!
//! Snapshots from older builds are upgraded step by step before they are
//! deserialized. The only historical layout is `0.1.0`, which kept audio
//! tracks, video clips and text elements in three separate flat lists.

use chrono::Utc;
use log::info;
use serde_json::{Map, Value};

use crate::error::{ClipdeckError, Result};
use crate::state::project::Project;

/// Current schema version for project snapshots.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Version assumed for snapshots that carry no version but still use the
/// split clip lists.
const LEGACY_SCHEMA_VERSION: &str = "0.1.0";

type MigrationFn = fn(Value) -> Result<Value>;

/// Known versions in order, each with the migration to the next one.
const MIGRATIONS: &[(&str, &str, MigrationFn)] = &[("0.1.0", "1.0.0", migrate_0_1_0_to_1_0_0)];

fn known_versions() -> impl Iterator<Item = &'static str> {
    MIGRATIONS
        .iter()
        .map(|(from, _, _)| *from)
        .chain(std::iter::once(CURRENT_SCHEMA_VERSION))
}

/// Upgrade a snapshot to [`CURRENT_SCHEMA_VERSION`].
pub fn migrate_snapshot(mut data: Value) -> Result<Value> {
    let mut version = detect_version(&data);

    if !known_versions().any(|known| known == version) {
        return Err(ClipdeckError::UnsupportedSchemaVersion { version });
    }

    while version != CURRENT_SCHEMA_VERSION {
        let (from, to, migrate) = MIGRATIONS
            .iter()
            .find(|(from, _, _)| *from == version)
            .copied()
            .ok_or_else(|| ClipdeckError::MigrationError {
                from: version.clone(),
                to: CURRENT_SCHEMA_VERSION.to_string(),
                reason: "no migration path".to_string(),
            })?;
        info!("Migrating project snapshot from {} to {}", from, to);
        data = migrate(data)?;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("schemaVersion".to_string(), Value::String(to.to_string()));
        }
        version = to.to_string();
    }

    Ok(data)
}

/// Migrate, deserialize and validate a snapshot.
pub fn load_snapshot(data: Value) -> Result<Project> {
    let project: Project = serde_json::from_value(migrate_snapshot(data)?)?;
    project.validate()?;
    Ok(project)
}

fn detect_version(data: &Value) -> String {
    if let Some(version) = data.get("schemaVersion").and_then(Value::as_str) {
        return version.to_string();
    }
    let legacy = ["audioTracks", "videoClips", "textElements"]
        .iter()
        .any(|key| data.get(*key).is_some());
    if legacy {
        LEGACY_SCHEMA_VERSION.to_string()
    } else {
        CURRENT_SCHEMA_VERSION.to_string()
    }
}

/// 0.1.0 → 1.0.0: fold the three flat clip lists into `clips`, moving the
/// kind-specific fields under `content`.
fn migrate_0_1_0_to_1_0_0(mut data: Value) -> Result<Value> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| ClipdeckError::MigrationError {
            from: "0.1.0".to_string(),
            to: "1.0.0".to_string(),
            reason: "snapshot is not an object".to_string(),
        })?;

    let stamp = obj
        .get("lastModified")
        .cloned()
        .unwrap_or_else(|| Value::String(Utc::now().to_rfc3339()));

    let mut clips = match obj.remove("clips") {
        Some(Value::Array(existing)) => existing,
        _ => Vec::new(),
    };

    let groups: [(&str, &str, &[&str]); 3] = [
        ("audioTracks", "audio", &["url", "name", "settings"]),
        ("videoClips", "video", &["url", "placement"]),
        ("textElements", "text", &["text", "x", "y", "style"]),
    ];

    for (list, kind, content_keys) in groups {
        let Some(Value::Array(items)) = obj.remove(list) else {
            continue;
        };
        for item in items {
            let Value::Object(mut flat) = item else {
                continue;
            };
            let mut content = Map::new();
            content.insert("kind".to_string(), Value::String(kind.to_string()));
            for key in content_keys {
                if let Some(value) = flat.remove(*key) {
                    content.insert(key.to_string(), value);
                }
            }
            flat.insert("content".to_string(), Value::Object(content));
            flat.entry("createdAt").or_insert_with(|| stamp.clone());
            clips.push(Value::Object(flat));
        }
    }

    obj.insert("clips".to_string(), Value::Array(clips));
    Ok(data)
}
