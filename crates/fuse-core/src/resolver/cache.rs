//! Thread-safe memo tables used by the resolver.
//!
//! Every table is a [`OnceMap`]: concurrent readers share one slot per key
//! and the slot is populated at most once, even when several threads miss
//! on the same key at the same time. Different keys never wait on each
//! other beyond the brief map lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::trace;

/// Map whose values are computed at most once per key.
#[derive(Debug)]
pub struct OnceMap<K, V> {
    slots: RwLock<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K, V> Default for OnceMap<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `init` if no value exists yet.
    ///
    /// Callers racing on the same key block until the first `init` finishes
    /// and then observe its value. `init` must not re-enter the map with the
    /// same key.
    pub fn get_or_init(&self, key: &K, init: impl FnOnce() -> V) -> V {
        let slot = self.slot(key);
        slot.get_or_init(init).clone()
    }

    /// Return the value for `key` if it has been populated.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of populated entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.clear();
    }

    fn slot(&self, key: &K) -> Arc<OnceLock<V>> {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(key) {
                return Arc::clone(slot);
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

/// Outcome of a filesystem probe.
#[derive(Debug, Clone)]
pub enum Probe {
    File,
    Dir,
    Missing,
    /// The path exists but could not be inspected (permissions, …).
    Inaccessible(Arc<io::Error>),
}

impl Probe {
    fn of(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Self::File,
            Ok(meta) if meta.is_dir() => Self::Dir,
            Ok(_) => Self::Missing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::Missing,
            Err(e) => Self::Inaccessible(Arc::new(e)),
        }
    }
}

/// Memoized `is_file`/`is_dir` checks.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: OnceMap<PathBuf, Probe>,
}

impl ProbeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `path`, hitting the filesystem only the first time.
    pub fn probe(&self, path: &Path) -> Probe {
        self.entries.get_or_init(&path.to_path_buf(), || {
            let probe = Probe::of(path);
            trace!(path = %path.display(), ?probe, "fs probe");
            probe
        })
    }

    pub fn is_file(&self, path: &Path) -> bool {
        matches!(self.probe(path), Probe::File)
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        matches!(self.probe(path), Probe::Dir)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
