//! Numbered, concurrency-safe storage of checked-link groups
//!
//! Groups are append-only: a number is handed out once, under the write lock, and
//! never reused. Reads share the lock. The whole store can be written to and
//! restored from a JSON snapshot.

use crate::{CheckedLink, LinkCheckError, LinkGroup};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Storage seam used by the dispatcher and the link service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Stores `links` as a new group and returns its number.
    async fn insert(&self, links: Vec<CheckedLink>) -> Result<u64, LinkCheckError>;

    /// Groups for `numbers`, in request order. Fails without a partial result when any
    /// number is unknown.
    async fn get_by_numbers(&self, numbers: &[u64]) -> Result<Vec<LinkGroup>, LinkCheckError>;

    /// Every stored group, each exactly once, in no particular order.
    async fn get_all(&self) -> Result<Vec<LinkGroup>, LinkCheckError>;
}

#[derive(Debug, Default)]
struct StoreState {
    groups: BTreeMap<u64, Vec<CheckedLink>>,
    next_number: u64,
}

impl StoreState {
    fn allocate(&mut self) -> u64 {
        let number = self.next_number.max(1);
        self.next_number = number + 1;
        number
    }
}

#[derive(Debug, Default)]
pub struct GroupStore {
    state: RwLock<StoreState>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.groups.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replaces the whole in-memory state with the snapshot at `path`.
    ///
    /// A missing file leaves the store as it is. A malformed snapshot is reported and
    /// nothing is replaced.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<(), LinkCheckError> {
        let path = path.as_ref();
        let mut state = self.state.write().await;

        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %path.display(), "no snapshot to load");
                return Ok(());
            }
            Err(e) => {
                return Err(LinkCheckError::Io(format!(
                    "open storage file {}: {e}",
                    path.display()
                )))
            }
        };

        let snapshot: Vec<LinkGroup> = serde_json::from_slice(&content).map_err(|e| {
            LinkCheckError::Serialization(format!("decode storage file {}: {e}", path.display()))
        })?;

        let mut seen = HashSet::with_capacity(snapshot.len());
        for group in &snapshot {
            if group.links_num == 0 || !seen.insert(group.links_num) {
                return Err(LinkCheckError::Serialization(format!(
                    "decode storage file {}: invalid or duplicate links_num {}",
                    path.display(),
                    group.links_num
                )));
            }
        }

        let groups: BTreeMap<u64, Vec<CheckedLink>> = snapshot
            .into_iter()
            .map(|group| (group.links_num, group.links))
            .collect();
        let next_number = groups.keys().next_back().map_or(1, |max| max + 1);

        info!(
            file = %path.display(),
            groups_count = groups.len(),
            next_number,
            "loaded storage snapshot"
        );

        *state = StoreState { groups, next_number };
        Ok(())
    }

    /// Writes every group to a uniquely named file next to `path`, syncs it and renames
    /// it over `path`. Concurrent saves never share a temporary file.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), LinkCheckError> {
        let path = path.as_ref();
        let state = self.state.read().await;

        let snapshot: Vec<LinkGroup> = state
            .groups
            .iter()
            .map(|(number, links)| LinkGroup {
                links_num: *number,
                links: links.clone(),
            })
            .collect();
        let encoded = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| LinkCheckError::Serialization(format!("encode storage file: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LinkCheckError::Io(format!("create storage dir {}: {e}", parent.display())))?;
        }

        let tmp_path = tmp_path_for(path);
        if let Err(e) = write_synced(&tmp_path, &encoded).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(LinkCheckError::Io(format!("write storage file {}: {e}", tmp_path.display())));
        }

        if let Err(e) = fs::rename(&tmp_path, path).await {
            warn!(file = %tmp_path.display(), error = %e, "rename failed, removing temporary snapshot");
            let _ = fs::remove_file(&tmp_path).await;
            return Err(LinkCheckError::Io(format!("rename storage file: {e}")));
        }

        info!(file = %path.display(), groups_count = snapshot.len(), "storage saved");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    PathBuf::from(name)
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[async_trait]
impl GroupRepository for GroupStore {
    async fn insert(&self, links: Vec<CheckedLink>) -> Result<u64, LinkCheckError> {
        let mut state = self.state.write().await;
        let number = state.allocate();
        let links_count = links.len();
        state.groups.insert(number, links);

        debug!(links_num = number, links_count, "inserted links batch");
        Ok(number)
    }

    async fn get_by_numbers(&self, numbers: &[u64]) -> Result<Vec<LinkGroup>, LinkCheckError> {
        let state = self.state.read().await;

        let groups = numbers
            .iter()
            .map(|number| {
                state
                    .groups
                    .get(number)
                    .map(|links| LinkGroup {
                        links_num: *number,
                        links: links.clone(),
                    })
                    .ok_or_else(|| {
                        warn!(links_num = *number, "requested links_num not found");
                        LinkCheckError::GroupNotFound(*number)
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(requested_groups = numbers.len(), returned_groups = groups.len(), "loaded links by nums");
        Ok(groups)
    }

    async fn get_all(&self) -> Result<Vec<LinkGroup>, LinkCheckError> {
        let state = self.state.read().await;
        let groups: Vec<LinkGroup> = state
            .groups
            .iter()
            .map(|(number, links)| LinkGroup {
                links_num: *number,
                links: links.clone(),
            })
            .collect();

        debug!(groups_count = groups.len(), "loaded all links groups");
        Ok(groups)
    }
}
