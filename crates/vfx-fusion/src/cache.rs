//! Operation result cache.
//!
//! Results are keyed by operation name plus the fully resolved arguments.
//! Images take part in the key by buffer identity, so the cache keeps a
//! handle to every input image of a live entry: an identity cannot be
//! recycled for different pixels while its entry exists.
//!
//! Eviction is least-recently-used once more than `max_operations`
//! entries are stored. A limit of zero disables the cache.

use crate::operation::Outputs;
use crate::value::{ImageRef, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;
use vfx_core::{Image, ImageId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    Image(ImageId),
    Double(u64),
    Int(i64),
    Bool(bool),
    Str(String),
}

/// Cache key: operation name and resolved arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    args: Vec<(String, KeyValue)>,
}

impl CacheKey {
    /// Builds a key from resolved arguments.
    ///
    /// Returns `None` if an argument is still deferred.
    pub fn new(operation: &str, args: &BTreeMap<String, Value>) -> Option<Self> {
        let args = args
            .iter()
            .map(|(name, v)| {
                let kv = match v {
                    Value::Image(ImageRef::Ready(img)) => KeyValue::Image(img.id()),
                    Value::Image(ImageRef::Deferred(_)) => return None,
                    Value::Double(d) => KeyValue::Double(d.to_bits()),
                    Value::Int(i) => KeyValue::Int(*i),
                    Value::Bool(b) => KeyValue::Bool(*b),
                    Value::Str(s) => KeyValue::Str(s.clone()),
                };
                Some((name.clone(), kv))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            operation: operation.to_string(),
            args,
        })
    }

    /// Operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

struct Entry {
    outputs: Outputs,
    // Held so that image ids in the key stay unique.
    _inputs: Vec<Image>,
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    tick: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
    /// Entries dropped by LRU eviction.
    pub evictions: u64,
    /// Entries currently stored.
    pub entries: usize,
    /// Entry limit.
    pub max_entries: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// Thread-safe LRU cache of operation outputs.
pub struct OperationCache {
    max_operations: usize,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl OperationCache {
    /// Creates a cache holding at most `max_operations` entries.
    pub fn new(max_operations: usize) -> Self {
        Self {
            max_operations,
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` when the limit is zero.
    pub fn is_enabled(&self) -> bool {
        self.max_operations > 0
    }

    /// Entry limit.
    pub fn max_operations(&self) -> usize {
        self.max_operations
    }

    /// Looks up outputs, refreshing the entry's recency.
    pub fn get(&self, key: &CacheKey) -> Option<Outputs> {
        if !self.is_enabled() {
            return None;
        }
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(operation = key.operation(), "cache hit");
                Some(entry.outputs.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(operation = key.operation(), "cache miss");
                None
            }
        }
    }

    /// Stores outputs, retaining `inputs`.
    pub fn insert(&self, key: CacheKey, inputs: Vec<Image>, outputs: Outputs) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            key,
            Entry {
                outputs,
                _inputs: inputs,
                last_used: tick,
            },
        );

        while inner.entries.len() > self.max_operations {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else { break };
            inner.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(operation = oldest.operation(), "cache evict");
        }
    }

    /// Drops every entry (and the images it retains).
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            max_entries: self.max_operations,
        }
    }
}

impl std::fmt::Debug for OperationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationCache").field("stats", &self.stats()).finish()
    }
}
