//! Local durable key-value tier.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ClipdeckError, Result};

/// Synchronous key-value store holding serialized snapshots.
pub trait LocalStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Returns false if nothing was stored under `key`.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| ClipdeckError::DirectoryCreateError {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl LocalStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| ClipdeckError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(content))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, value).map_err(|e| ClipdeckError::FileWriteError {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| ClipdeckError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| ClipdeckError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_read_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("cache")).unwrap();

        assert_eq!(store.read("project").unwrap(), None);
        store.write("project", r#"{"name":"a"}"#).unwrap();
        store.write("project", r#"{"name":"b"}"#).unwrap();
        assert_eq!(store.read("project").unwrap().as_deref(), Some(r#"{"name":"b"}"#));

        assert!(store.remove("project").unwrap());
        assert!(!store.remove("project").unwrap());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("clipdeck.project", "{}").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clipdeck.project.json".to_string()]);
    }

    #[test]
    fn test_key_sanitized() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let path = store.path_for("../escape/me");
        assert_eq!(path.parent().unwrap(), dir.path());
    }
}
