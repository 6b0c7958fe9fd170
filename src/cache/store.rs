//! Generation-scoped cache store.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::entry::StoredResponse;
use crate::cache::key::CacheKey;
use crate::observability::metrics;

/// Build-time version tag identifying one cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GenerationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Errors from cache snapshot persistence.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache snapshot is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Versioned key/value store for intercepted responses.
///
/// Exactly one generation is active at a time and `lookup` only ever reads
/// from it. Writes go through a handle obtained from `open`, so a rollover
/// can fill a new generation while the old one keeps serving.
pub trait CacheStore: Send + Sync + 'static {
    /// Write handle for one generation.
    type Handle: Clone + Send + Sync + 'static;

    /// Open (creating if absent) the generation `id`. Idempotent.
    fn open(&self, id: &GenerationId) -> Self::Handle;

    /// Insert or overwrite `key` in the handle's generation.
    fn put(&self, handle: &Self::Handle, key: CacheKey, value: StoredResponse);

    /// Look `key` up in the active generation.
    fn lookup(&self, key: &CacheKey) -> Option<Arc<StoredResponse>>;

    /// Make `id` the active generation, creating it if needed.
    fn activate(&self, id: &GenerationId);

    /// Currently active generation, if any.
    fn active(&self) -> Option<GenerationId>;

    /// Write handle for the active generation. Unlike `open`, never creates.
    fn active_handle(&self) -> Option<Self::Handle>;

    /// Remove every generation other than `keep`. The active generation is
    /// never removed. Returns how many generations were dropped.
    fn delete_generations_except(&self, keep: &GenerationId) -> usize;

    /// Remove one non-active generation. Returns false if `id` is active or
    /// unknown.
    fn discard(&self, id: &GenerationId) -> bool;

    /// Known generation ids, sorted.
    fn generations(&self) -> Vec<GenerationId>;

    /// Number of entries in generation `id` (0 if unknown).
    fn len(&self, id: &GenerationId) -> usize;
}

type Entries = DashMap<CacheKey, Arc<StoredResponse>>;

/// Write handle into one [`MemoryCacheStore`] generation.
///
/// The handle keeps its generation's map alive. If the generation is deleted
/// while a write is in flight, the write completes into the detached map and
/// is never visible to `lookup`.
#[derive(Debug, Clone)]
pub struct GenerationHandle {
    id: GenerationId,
    entries: Arc<Entries>,
}

impl GenerationHandle {
    pub fn id(&self) -> &GenerationId {
        &self.id
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    generation: GenerationId,
    entries: Vec<(CacheKey, StoredResponse)>,
}

/// In-memory [`CacheStore`] with optional JSON snapshot persistence.
#[derive(Default)]
pub struct MemoryCacheStore {
    generations: DashMap<GenerationId, Arc<Entries>>,
    active: ArcSwapOption<GenerationId>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`save_to_file`](Self::save_to_file).
    ///
    /// A missing file yields an empty store with no active generation.
    pub fn load_from_file(path: &Path) -> Result<Self, CacheStoreError> {
        let store = Self::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;
            let handle = store.open(&snapshot.generation);
            for (key, value) in snapshot.entries {
                store.put(&handle, key, value);
            }
            store.activate(&snapshot.generation);
            tracing::info!(
                generation = %snapshot.generation,
                entries = store.len(&snapshot.generation),
                "Loaded cache snapshot"
            );
        }
        Ok(store)
    }

    /// Persist the active generation. Returns the number of entries written;
    /// writes nothing when no generation is active.
    pub fn save_to_file(&self, path: &Path) -> Result<usize, CacheStoreError> {
        let Some(generation) = self.active() else {
            return Ok(0);
        };
        let entries: Vec<(CacheKey, StoredResponse)> = self
            .generations
            .get(&generation)
            .map(|map| {
                map.iter()
                    .map(|r| (r.key().clone(), r.value().as_ref().clone()))
                    .collect()
            })
            .unwrap_or_default();

        let count = entries.len();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &Snapshot { generation: generation.clone(), entries })?;
        tracing::info!(generation = %generation, entries = count, "Saved cache snapshot");
        Ok(count)
    }

    fn entries_for(&self, id: &GenerationId) -> Arc<Entries> {
        self.generations
            .entry(id.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone()
    }
}

impl CacheStore for MemoryCacheStore {
    type Handle = GenerationHandle;

    fn open(&self, id: &GenerationId) -> GenerationHandle {
        GenerationHandle {
            id: id.clone(),
            entries: self.entries_for(id),
        }
    }

    fn put(&self, handle: &GenerationHandle, key: CacheKey, value: StoredResponse) {
        handle.entries.insert(key, Arc::new(value));
        metrics::record_cache_entries(handle.id.as_str(), handle.entries.len());
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<StoredResponse>> {
        let active = self.active.load_full()?;
        let entries = self.generations.get(active.as_ref())?.clone();
        let hit = entries.get(key).map(|r| r.value().clone());
        hit
    }

    fn activate(&self, id: &GenerationId) {
        self.entries_for(id);
        self.active.store(Some(Arc::new(id.clone())));
    }

    fn active(&self) -> Option<GenerationId> {
        self.active.load_full().map(|id| id.as_ref().clone())
    }

    fn active_handle(&self) -> Option<GenerationHandle> {
        let active = self.active.load_full()?;
        let entries = self.generations.get(active.as_ref())?.clone();
        Some(GenerationHandle {
            id: active.as_ref().clone(),
            entries,
        })
    }

    fn delete_generations_except(&self, keep: &GenerationId) -> usize {
        let active = self.active();
        let before = self.generations.len();
        self.generations
            .retain(|id, _| id == keep || Some(id) == active.as_ref());
        before - self.generations.len()
    }

    fn discard(&self, id: &GenerationId) -> bool {
        if self.active().as_ref() == Some(id) {
            return false;
        }
        self.generations.remove(id).is_some()
    }

    fn generations(&self) -> Vec<GenerationId> {
        let mut ids: Vec<GenerationId> = self.generations.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn len(&self, id: &GenerationId) -> usize {
        self.generations.get(id).map(|e| e.len()).unwrap_or(0)
    }
}
