//! Startup project resolution.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::remote::{newest, RemoteDocument, RemoteStore};
use crate::config::HistoryConfig;
use crate::error::Result;
use crate::state::Project;
use crate::store::ProjectStore;

/// Where the startup project came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadSource {
    /// The local cache.
    Local,
    /// The owner's latest remote document.
    Remote,
    /// Nothing found; start from a fresh project.
    Default,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub project: Option<Project>,
    pub source: LoadSource,
}

impl LoadOutcome {
    pub(crate) fn local(project: Option<Project>) -> Self {
        let source = if project.is_some() {
            LoadSource::Local
        } else {
            LoadSource::Default
        };
        Self { project, source }
    }

    /// Build an editor around the loaded project, or a fresh one.
    pub fn into_store(self, history: &HistoryConfig) -> Result<ProjectStore> {
        match self.project {
            Some(project) => ProjectStore::from_project(project, history),
            None => Ok(ProjectStore::new(history)),
        }
    }
}

/// Result of a signed-in resolution: the outcome plus the remote snapshot
/// the project was confirmed against or loaded from.
pub(crate) struct Resolved {
    pub outcome: LoadOutcome,
    pub synced: Option<(String, Map<String, Value>)>,
}

pub(crate) struct StartupResolver<'a> {
    pub remote: &'a dyn RemoteStore,
    pub collection: &'a str,
    pub fallback_limit: usize,
}

impl StartupResolver<'_> {
    pub async fn resolve(&self, cached: Option<Project>, user: &str) -> Resolved {
        if let Some(project) = &cached {
            if let Some(document) = self.confirm(project, user).await {
                debug!("Local project {} confirmed remotely", project.id);
                return Resolved {
                    synced: Some((document.id.clone(), document.project_fields())),
                    outcome: LoadOutcome::local(cached),
                };
            }
        }

        if let Some(document) = self.latest(user).await {
            let id = document.id.clone();
            let fields = document.project_fields();
            match document.into_project() {
                Ok(project) => {
                    info!("Loaded project {} from remote store", id);
                    return Resolved {
                        outcome: LoadOutcome {
                            project: Some(project),
                            source: LoadSource::Remote,
                        },
                        synced: Some((id, fields)),
                    };
                }
                Err(e) => warn!("Remote project {} is unreadable: {}", id, e),
            }
        }

        Resolved {
            outcome: LoadOutcome::local(cached),
            synced: None,
        }
    }

    /// The remote copy of `project`, if it exists and belongs to `user`.
    async fn confirm(&self, project: &Project, user: &str) -> Option<RemoteDocument> {
        match self.remote.get(self.collection, &project.id).await {
            Ok(Some(document)) if document.owner_id() == Some(user) => Some(document),
            Ok(Some(_)) => {
                debug!("Local project {} belongs to another user", project.id);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not confirm local project {}: {}", project.id, e);
                None
            }
        }
    }

    async fn latest(&self, user: &str) -> Option<RemoteDocument> {
        match self.remote.latest_by_owner(self.collection, user).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Ordered project query failed, falling back: {}", e);
                match self
                    .remote
                    .list_by_owner(self.collection, user, self.fallback_limit)
                    .await
                {
                    Ok(documents) => newest(documents),
                    Err(e) => {
                        warn!("Unordered project query failed: {}", e);
                        None
                    }
                }
            }
        }
    }
}
