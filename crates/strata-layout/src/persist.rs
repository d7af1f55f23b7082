//! Saved manual positions and the stores that hold them.
//!
//! A saved layout is keyed by the identity of the node set: a hash of the
//! sorted, deduplicated node ids. Editing edges, flows or categories keeps
//! the key, while adding or removing a node changes it, at which point the
//! old record is simply never found again.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::{fs, sync::RwLock};

use strata_core::Position;

use crate::{error::StoreError, geometry::NodeGeometries};

/// Key identifying a node set.
///
/// SHA-256 over the sorted, deduplicated ids, each prefixed with its byte
/// length so no two distinct sets can share an encoding.
pub fn layout_key<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let ids: BTreeSet<&str> = ids.into_iter().collect();
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update((id.len() as u64).to_le_bytes());
        hasher.update(id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Manual positions for one node set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    pub key: String,
    pub positions: BTreeMap<String, Position>,
}

impl SavedLayout {
    /// Snapshot the x/y of every node. Layers, shapes and ports are not kept.
    pub fn capture(geometries: &NodeGeometries) -> Self {
        Self {
            key: layout_key(geometries.keys().map(String::as_str)),
            positions: geometries
                .iter()
                .map(|(id, geometry)| (id.clone(), geometry.placement.position()))
                .collect(),
        }
    }
}

/// Outcome of [`merge_layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub geometries: NodeGeometries,
    /// Number of nodes that took their saved position.
    pub applied: usize,
}

/// Overlay saved positions onto a computed layout.
///
/// Nothing is applied when `saved` belongs to a different node set. Otherwise
/// each node with a saved entry takes that x/y and keeps its computed layer;
/// every other node keeps its computed position.
pub fn merge_layout(computed: &NodeGeometries, saved: &SavedLayout) -> Merged {
    let mut geometries = computed.clone();
    let key = layout_key(computed.keys().map(String::as_str));
    if saved.key != key {
        debug!(saved = saved.key.as_str(), current = key.as_str(); "Saved layout belongs to another node set");
        return Merged {
            geometries,
            applied: 0,
        };
    }

    let mut applied = 0;
    for (id, geometry) in geometries.iter_mut() {
        if let Some(position) = saved.positions.get(id) {
            geometry.move_to(*position);
            applied += 1;
        }
    }
    debug!(applied = applied; "Merged saved layout");
    Merged {
        geometries,
        applied,
    }
}

/// Key-value capability holding saved layouts.
///
/// A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SavedLayout>, StoreError>;

    async fn set(&self, key: &str, layout: &SavedLayout) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, for tests and non-persistent sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    layouts: RwLock<HashMap<String, SavedLayout>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.layouts.read().await.is_empty()
    }
}

#[async_trait]
impl LayoutStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<SavedLayout>, StoreError> {
        Ok(self.layouts.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, layout: &SavedLayout) -> Result<(), StoreError> {
        self.layouts
            .write()
            .await
            .insert(key.to_string(), layout.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.layouts.write().await.remove(key);
        Ok(())
    }
}

/// Distinguishes temp files of overlapping writes within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One `<key>.json` file per saved layout inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under `~/.strata/layouts/`.
    pub fn in_home() -> Self {
        Self::new(strata_core::strata_dir().join("layouts"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl LayoutStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<SavedLayout>, StoreError> {
        let path = self.path(key)?;
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                trace!(key = key; "No saved layout");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Written through a temp file + rename so a reader never sees half a record.
    ///
    /// Each write gets its own temp file; concurrent writes to one key end
    /// with the last rename winning.
    async fn set(&self, key: &str, layout: &SavedLayout) -> Result<(), StoreError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(layout)?;
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{key}.{}.{seq}.json.tmp", process::id()));
        if let Err(err) = fs::write(&tmp, json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
