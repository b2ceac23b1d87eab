//! Diff-based reconciliation of a named collection against a remote folder.
//!
//! Only additions and modifications are pushed. Names that exist remotely
//! but not locally are left alone; deletion is never inferred from absence.

use crate::error::{SyncError, SyncResult};
use crate::pool::{BoundedPool, PushStrategy};
use crate::status::StatusHub;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use worksync_model::{DocumentKind, JSON_MIME};
use worksync_remote::{content_hash, index_by_name, RemoteEntry, RemoteStore};

/// One remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// The name is absent remotely.
    Create {
        /// File name.
        name: String,
        /// New content.
        content: Bytes,
    },
    /// The name exists remotely.
    Update {
        /// Remote id of the existing file.
        id: String,
        /// File name.
        name: String,
        /// New content.
        content: Bytes,
    },
}

impl DiffOp {
    /// Name the operation writes.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. } | Self::Update { name, .. } => name,
        }
    }
}

/// The operations needed to bring a remote folder up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    /// Operations in local order.
    pub ops: Vec<DiffOp>,
    /// Names skipped because the remote content already matches.
    pub skipped: Vec<String>,
}

impl DiffPlan {
    /// Computes the plan for `local` against the listed `remote` entries.
    ///
    /// A local name listed twice keeps its last content. Remote duplicates
    /// resolve to the last listed entry and remote folders are ignored.
    pub fn plan(local: Vec<(String, Bytes)>, remote: Vec<RemoteEntry>, skip_unchanged: bool) -> Self {
        let remote = index_by_name(remote);

        let mut order = Vec::with_capacity(local.len());
        let mut latest: HashMap<String, Bytes> = HashMap::with_capacity(local.len());
        for (name, content) in local {
            if latest.insert(name.clone(), content).is_none() {
                order.push(name);
            }
        }

        let mut plan = DiffPlan::default();
        for name in order {
            let Some(content) = latest.remove(&name) else {
                continue;
            };
            match remote.get(&name) {
                Some(entry) => {
                    if skip_unchanged
                        && entry.hash.as_deref() == Some(content_hash(&content).as_str())
                    {
                        plan.skipped.push(name);
                        continue;
                    }
                    plan.ops.push(DiffOp::Update {
                        id: entry.id.clone(),
                        name,
                        content,
                    });
                }
                None => plan.ops.push(DiffOp::Create { name, content }),
            }
        }
        plan
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing needs writing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// A failed operation of a batch.
#[derive(Debug, Clone)]
pub struct OpFailure {
    /// Name the operation wrote.
    pub name: String,
    /// Why it failed.
    pub error: String,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    /// Names created.
    pub created: Vec<String>,
    /// Names updated.
    pub updated: Vec<String>,
    /// Names left alone because their content matched.
    pub skipped: Vec<String>,
    /// Operations that failed.
    pub failed: Vec<OpFailure>,
}

impl DiffOutcome {
    /// Returns `true` if no operation failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names whose operation failed, sorted.
    #[must_use]
    pub fn failed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.failed.iter().map(|f| f.name.clone()).collect();
        names.sort();
        names
    }

    /// Number of operations attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.created.len() + self.updated.len() + self.failed.len()
    }

    /// Converts a partial failure into [`SyncError::PartialBatchFailure`].
    ///
    /// # Errors
    ///
    /// Returns the failed names if any operation failed.
    pub fn into_result(self) -> SyncResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(SyncError::PartialBatchFailure {
                failed: self.failed_names(),
            })
        }
    }
}

enum Applied {
    Created(String),
    Updated(String),
    Failed(OpFailure),
}

/// Pushes a named collection to one remote folder.
pub struct DiffSynchronizer {
    store: Arc<dyn RemoteStore>,
    pool: BoundedPool,
    skip_unchanged: bool,
    progress: Option<(StatusHub, DocumentKind)>,
}

impl DiffSynchronizer {
    /// Creates a synchronizer using `strategy` for fan-out.
    pub fn new(store: Arc<dyn RemoteStore>, strategy: PushStrategy) -> Self {
        Self {
            store,
            pool: BoundedPool::new(strategy),
            skip_unchanged: false,
            progress: None,
        }
    }

    /// Skips names whose remote hash matches the local content.
    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Publishes item progress under `kind`.
    pub fn with_progress(mut self, hub: StatusHub, kind: DocumentKind) -> Self {
        self.progress = Some((hub, kind));
        self
    }

    /// Brings `folder` up to date with `local`.
    ///
    /// Individual failures do not stop the batch; they are collected in the
    /// outcome. Only a failure to list the folder is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote folder cannot be listed.
    pub async fn sync(&self, folder: &str, local: Vec<(String, Bytes)>) -> SyncResult<DiffOutcome> {
        let remote = self.store.list(folder).await?;
        let plan = DiffPlan::plan(local, remote, self.skip_unchanged);

        tracing::debug!(
            folder,
            ops = plan.len(),
            skipped = plan.skipped.len(),
            "Computed diff"
        );

        if let Some((hub, kind)) = &self.progress {
            let total = plan.len();
            hub.update(*kind, |d| {
                d.total_items = total;
                d.completed_items = 0;
            });
        }

        let store = &self.store;
        let progress = &self.progress;
        let results = self
            .pool
            .run(
                plan.ops,
                |_| {
                    if let Some((hub, kind)) = progress {
                        hub.update(*kind, |d| d.completed_items += 1);
                    }
                },
                |op| async move { apply(store.as_ref(), folder, op).await },
            )
            .await;

        let mut outcome = DiffOutcome {
            skipped: plan.skipped,
            ..DiffOutcome::default()
        };
        for result in results {
            match result {
                Applied::Created(name) => outcome.created.push(name),
                Applied::Updated(name) => outcome.updated.push(name),
                Applied::Failed(failure) => {
                    tracing::warn!(name = %failure.name, error = %failure.error, "Remote write failed");
                    outcome.failed.push(failure);
                }
            }
        }
        Ok(outcome)
    }
}

async fn apply(store: &dyn RemoteStore, folder: &str, op: DiffOp) -> Applied {
    match op {
        DiffOp::Create { name, content } => {
            match store.create_file(folder, &name, content, JSON_MIME).await {
                Ok(_) => Applied::Created(name),
                Err(err) => Applied::Failed(OpFailure {
                    name,
                    error: err.to_string(),
                }),
            }
        }
        DiffOp::Update { id, name, content } => match store.update_file(&id, content).await {
            Ok(true) => Applied::Updated(name),
            Ok(false) => Applied::Failed(OpFailure {
                name,
                error: format!("remote file {id} no longer exists"),
            }),
            Err(err) => Applied::Failed(OpFailure {
                name,
                error: err.to_string(),
            }),
        },
    }
}

impl std::fmt::Debug for DiffSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffSynchronizer")
            .field("pool", &self.pool)
            .field("skip_unchanged", &self.skip_unchanged)
            .finish_non_exhaustive()
    }
}

/// Names present remotely but absent from `local`. Reported, never deleted.
pub fn remote_only(local: &[(String, Bytes)], remote: &[RemoteEntry]) -> Vec<String> {
    let local: HashSet<&str> = local.iter().map(|(n, _)| n.as_str()).collect();
    let mut names: Vec<String> = remote
        .iter()
        .filter(|e| !e.is_folder && !local.contains(e.name.as_str()))
        .map(|e| e.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
