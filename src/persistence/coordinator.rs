//! Two-tier save pipeline.
//!
//! Every project change is written synchronously to the local store. When a
//! user is signed in, a debounced merge write to the remote store follows;
//! it carries only the top-level fields that changed since the last
//! successful remote write. Failures never reach the editor: they show up in
//! [`PersistenceStatus`] and the log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::auth::AuthProvider;
use super::debounce::Debouncer;
use super::loader::{LoadOutcome, StartupResolver};
use super::local::LocalStore;
use super::remote::{RemoteStore, OWNER_FIELD, UPDATED_FIELD};
use crate::config::PersistenceConfig;
use crate::error::{ClipdeckError, Result};
use crate::state::{load_snapshot, Project};
use crate::store::{ProjectStore, SubscriptionId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveStatus {
    #[default]
    Idle,
    /// A remote write is scheduled.
    Pending,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistenceMode {
    /// Only the local store is known to hold the project.
    #[default]
    Local,
    /// Only the remote store holds it; the last local write failed.
    Remote,
    /// Both tiers hold the current project.
    Hybrid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceStatus {
    pub save_status: SaveStatus,
    pub mode: PersistenceMode,
    pub last_saved: Option<DateTime<Utc>>,
}

type Snapshot = Map<String, Value>;

#[derive(Default)]
struct SyncState {
    /// Project id and fields of the last successful remote write.
    last_synced: Option<(String, Snapshot)>,
}

struct Shared {
    config: PersistenceConfig,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    status: watch::Sender<PersistenceStatus>,
    debouncer: Mutex<Debouncer>,
    /// Latest snapshot waiting for the remote tier.
    latest: Mutex<Option<(String, Snapshot)>>,
    /// Held for the whole remote write, so writes never overlap.
    sync: tokio::sync::Mutex<SyncState>,
    /// Outcome of the most recent local write.
    local_ok: AtomicBool,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("config", &self.shared.config)
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

impl PersistenceCoordinator {
    pub fn new(
        config: PersistenceConfig,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let (status, _) = watch::channel(PersistenceStatus::default());
        let debouncer = Debouncer::new(config.debounce());
        Self {
            shared: Arc::new(Shared {
                config,
                local,
                remote,
                auth,
                status,
                debouncer: Mutex::new(debouncer),
                latest: Mutex::new(None),
                sync: tokio::sync::Mutex::new(SyncState::default()),
                local_ok: AtomicBool::new(true),
            }),
        }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.shared.config
    }

    /// Current status snapshot.
    pub fn status(&self) -> PersistenceStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PersistenceStatus> {
        self.shared.status.subscribe()
    }

    /// Persist every project change made through `store`.
    pub fn observe(&self, store: &mut ProjectStore) -> SubscriptionId {
        let coordinator = self.clone();
        store.subscribe(move |event| {
            if event.change.touches_project() {
                coordinator.on_project_changed(event.project());
            }
        })
    }

    /// Save `project`: local write now, remote write after the debounce
    /// window when signed in.
    pub fn on_project_changed(&self, project: &Project) {
        let snapshot = match snapshot_of(project) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Could not serialize project {}: {}", project.id, e);
                self.update_status(|status| status.save_status = SaveStatus::Error);
                return;
            }
        };
        let saved_locally = self.write_local(&snapshot);

        let Some(user) = self.shared.auth.current_user() else {
            self.debouncer().cancel();
            self.settle_local(saved_locally);
            return;
        };

        *self.latest() = Some((project.id.clone(), snapshot));
        let coordinator = self.clone();
        let scheduled = self.debouncer().schedule(move || async move {
            coordinator.flush().await;
        });
        match scheduled {
            Ok(()) => {
                debug!("Remote save of {} scheduled for {}", project.id, user);
                self.update_status(|status| status.save_status = SaveStatus::Pending);
            }
            Err(e) => {
                warn!("Remote save skipped: {}", e);
                self.settle_local(saved_locally);
            }
        }
    }

    /// Write the latest scheduled snapshot to the remote store now.
    ///
    /// Waits for any write already in flight. Returns true on success, false
    /// when there was nothing to write or the write failed.
    pub async fn flush(&self) -> bool {
        let mut sync = self.shared.sync.lock().await;

        let latest = self.latest().clone();
        let Some((project_id, snapshot)) = latest else {
            return false;
        };
        let Some(user) = self.shared.auth.current_user() else {
            debug!("Signed out before remote save of {}", project_id);
            self.update_status(|status| {
                status.mode = PersistenceMode::Local;
                if status.save_status == SaveStatus::Pending {
                    status.save_status = SaveStatus::Idle;
                }
            });
            return false;
        };

        let previous = sync
            .last_synced
            .as_ref()
            .filter(|(id, _)| *id == project_id)
            .map(|(_, fields)| fields);
        let mut fields = changed_fields(previous, &snapshot);
        let now = Utc::now();
        fields.insert("id".to_string(), Value::String(project_id.clone()));
        fields.insert(OWNER_FIELD.to_string(), Value::String(user));
        fields.insert(UPDATED_FIELD.to_string(), Value::String(now.to_rfc3339()));

        self.update_status(|status| status.save_status = SaveStatus::Saving);
        debug!("Merging {} fields into {}", fields.len(), project_id);

        match self.merge(&project_id, fields).await {
            Ok(()) => {
                info!("Project {} saved to remote store", project_id);
                sync.last_synced = Some((project_id, snapshot));
                let rescheduled = self.debouncer().is_pending();
                self.update_status(|status| {
                    status.save_status = if rescheduled {
                        SaveStatus::Pending
                    } else {
                        SaveStatus::Saved
                    };
                    status.mode = self.synced_mode();
                    status.last_saved = Some(now);
                });
                true
            }
            Err(e) => {
                warn!("Remote save of {} failed: {}", project_id, e);
                self.update_status(|status| {
                    status.save_status = SaveStatus::Error;
                    status.mode = PersistenceMode::Local;
                });
                false
            }
        }
    }

    /// The project in the local store, if readable.
    pub fn read_local(&self) -> Option<Project> {
        let key = &self.shared.config.local_key;
        let raw = match self.shared.local.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read local project: {}", e);
                return None;
            }
        };
        let parsed = serde_json::from_str::<Value>(&raw)
            .map_err(ClipdeckError::from)
            .and_then(load_snapshot);
        match parsed {
            Ok(project) => Some(project),
            Err(e) => {
                warn!("Discarding unreadable local project: {}", e);
                None
            }
        }
    }

    /// Pick the project to open at startup.
    ///
    /// Signed out, this is the local cache. Signed in, the cache is kept if
    /// the remote store confirms the user owns it; otherwise the user's
    /// most recently updated remote project wins, falling back to an
    /// unordered query when the ordered one fails, and finally to the cache.
    pub async fn restore(&self) -> LoadOutcome {
        let cached = self.read_local();
        let Some(user) = self.shared.auth.current_user() else {
            self.update_status(|status| status.mode = PersistenceMode::Local);
            return LoadOutcome::local(cached);
        };

        let resolver = StartupResolver {
            remote: self.shared.remote.as_ref(),
            collection: &self.shared.config.collection,
            fallback_limit: self.shared.config.fallback_query_limit,
        };
        let resolved = resolver.resolve(cached, &user).await;

        if let Some(project) = &resolved.outcome.project {
            match snapshot_of(project) {
                Ok(snapshot) => {
                    self.write_local(&snapshot);
                }
                Err(e) => warn!("Could not cache project {}: {}", project.id, e),
            }
        }
        let mode = if resolved.synced.is_some() {
            self.synced_mode()
        } else {
            PersistenceMode::Local
        };
        self.shared.sync.lock().await.last_synced = resolved.synced;
        self.update_status(|status| status.mode = mode);
        resolved.outcome
    }

    /// Cancel any pending remote write. A write already running completes.
    pub fn shutdown(&self) {
        if self.debouncer().cancel() {
            info!("Pending remote save cancelled");
            self.update_status(|status| {
                if status.save_status == SaveStatus::Pending {
                    status.save_status = SaveStatus::Idle;
                }
            });
        }
    }

    fn write_local(&self, snapshot: &Snapshot) -> bool {
        let key = &self.shared.config.local_key;
        let written = serde_json::to_string(snapshot)
            .map_err(ClipdeckError::from)
            .and_then(|raw| self.shared.local.write(key, &raw));
        let saved = match written {
            Ok(()) => true,
            Err(e) => {
                warn!("Local save failed: {}", e);
                false
            }
        };
        self.shared.local_ok.store(saved, Ordering::Relaxed);
        saved
    }

    /// Mode once the remote store holds the current project.
    fn synced_mode(&self) -> PersistenceMode {
        if self.shared.local_ok.load(Ordering::Relaxed) {
            PersistenceMode::Hybrid
        } else {
            PersistenceMode::Remote
        }
    }

    fn settle_local(&self, saved: bool) {
        self.update_status(|status| {
            status.mode = PersistenceMode::Local;
            if saved {
                status.save_status = SaveStatus::Saved;
                status.last_saved = Some(Utc::now());
            } else {
                status.save_status = SaveStatus::Error;
            }
        });
    }

    async fn merge(&self, id: &str, fields: Snapshot) -> Result<()> {
        let collection = &self.shared.config.collection;
        let write = self.shared.remote.merge(collection, id, fields);
        match self.shared.config.write_timeout() {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .unwrap_or_else(|_| {
                    Err(ClipdeckError::RemoteTimeout {
                        after_ms: limit.as_millis() as u64,
                    })
                }),
            None => write.await,
        }
    }

    fn update_status(&self, modify: impl FnOnce(&mut PersistenceStatus)) {
        self.shared.status.send_modify(modify);
    }

    fn debouncer(&self) -> std::sync::MutexGuard<'_, Debouncer> {
        self.shared
            .debouncer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn latest(&self) -> std::sync::MutexGuard<'_, Option<(String, Snapshot)>> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot_of(project: &Project) -> Result<Snapshot> {
    match serde_json::to_value(project)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(ClipdeckError::InvalidParameter {
            name: "project",
            reason: "did not serialize to an object".to_string(),
        }),
    }
}

/// Top-level fields of `current` that differ from `previous`. Fields that
/// disappeared are sent as null.
fn changed_fields(previous: Option<&Snapshot>, current: &Snapshot) -> Snapshot {
    let Some(previous) = previous else {
        return current.clone();
    };
    let mut changed: Snapshot = current
        .iter()
        .filter(|(key, value)| previous.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for key in previous.keys() {
        if !current.contains_key(key) {
            changed.insert(key.clone(), Value::Null);
        }
    }
    changed
}
