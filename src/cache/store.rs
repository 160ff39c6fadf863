//! Cache Store Module
//!
//! Main cache engine: named namespaces of TTL entries, one lock per namespace,
//! loaded from and persisted to a flat record file.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::cache::codec::{decode_record, encode_record};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock, Ttl};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::logging::{CacheLogger, TracingLogger};

type EntryMap<V> = HashMap<String, CacheEntry<V>>;

// == Namespace ==
/// One namespace: its entry map and the lock guarding it are the same object.
struct Namespace<V> {
    entries: Mutex<EntryMap<V>>,
}

impl<V> Namespace<V> {
    fn new(entries: EntryMap<V>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Every critical section is a single insert or clone, so a poisoned map
    /// is still consistent and safe to keep using.
    fn lock(&self) -> MutexGuard<'_, EntryMap<V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Cache Builder ==
/// Collects construction options for [`NamespacedCache`].
pub struct CacheBuilder<V = Value> {
    path: PathBuf,
    seeds: Vec<(String, HashMap<String, V>)>,
    logger: Arc<dyn CacheLogger>,
    clock: Arc<dyn Clock>,
    create_if_missing: bool,
}

impl<V> CacheBuilder<V> {
    /// Starts a builder for a cache backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seeds: Vec::new(),
            logger: Arc::new(TracingLogger),
            clock: Arc::new(SystemClock),
            create_if_missing: false,
        }
    }

    /// Pre-populates `namespace` with `values` before the file is loaded.
    ///
    /// Seeded entries never expire. Records in the file for the same key
    /// replace them.
    pub fn seed(mut self, namespace: impl Into<String>, values: HashMap<String, V>) -> Self {
        self.seeds.push((namespace.into(), values));
        self
    }

    /// Routes cache messages to `logger` instead of [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn CacheLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Reads time from `clock` instead of [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Treats a missing backing file as an empty cache instead of an error.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

impl<V: DeserializeOwned> CacheBuilder<V> {
    // == Open ==
    /// Seeds the cache, then loads the backing file.
    ///
    /// Any failure to read or parse the file is returned; the cache is not
    /// usable in that case and the host should abort startup.
    pub fn open(self) -> Result<NamespacedCache<V>> {
        let now = self.clock.now_ms();
        let mut table: HashMap<String, EntryMap<V>> = HashMap::new();
        for (namespace, values) in self.seeds {
            let entries = table.entry(namespace).or_default();
            for (key, value) in values {
                entries.insert(key, CacheEntry::new(value, Ttl::Never, now));
            }
        }

        match load_records(&self.path, &mut table) {
            Ok(records) => self.logger.info(
                &format!(
                    "loading cache data success: {} records in {} namespaces from {}",
                    records,
                    table.len(),
                    self.path.display()
                ),
                None,
            ),
            Err(err) if self.create_if_missing && is_missing_file(&err) => self.logger.info(
                &format!(
                    "cache file {} not found, starting with {} seeded namespaces",
                    self.path.display(),
                    table.len()
                ),
                None,
            ),
            Err(err) => {
                self.logger.error("load cache error", Some(&err));
                return Err(err);
            }
        }

        let namespaces = table
            .into_iter()
            .map(|(name, entries)| (name, Arc::new(Namespace::new(entries))))
            .collect();

        Ok(NamespacedCache {
            namespaces: RwLock::new(namespaces),
            path: self.path,
            logger: self.logger,
            clock: self.clock,
            stats: StatsRecorder::default(),
            persist_lock: Mutex::new(()),
        })
    }
}

/// Reads every record of `path` into `table`, returning how many were read.
fn load_records<V: DeserializeOwned>(
    path: &Path,
    table: &mut HashMap<String, EntryMap<V>>,
) -> Result<usize> {
    let file = File::open(path).map_err(|e| CacheError::io(path, e))?;
    let mut records = 0;

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| CacheError::io(path, e))?;
        let (namespace, key, entry) =
            decode_record(&line).map_err(|source| CacheError::Load {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
        table.entry(namespace).or_default().insert(key, entry);
        records += 1;
    }

    Ok(records)
}

fn is_missing_file(err: &CacheError) -> bool {
    matches!(err, CacheError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
}

// == Namespaced Cache ==
/// Thread-safe cache of namespaces, each mapping keys to TTL entries.
///
/// The namespace table sits behind a structural `RwLock` that is only
/// written when a namespace is created. Each namespace has its own `Mutex`,
/// so traffic on one namespace never blocks another. Values are cloned on
/// the way in and on the way out; callers never share the stored copy.
///
/// Share it between threads with `Arc`.
pub struct NamespacedCache<V = Value> {
    namespaces: RwLock<HashMap<String, Arc<Namespace<V>>>>,
    path: PathBuf,
    logger: Arc<dyn CacheLogger>,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
    persist_lock: Mutex<()>,
}

impl<V> fmt::Debug for NamespacedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedCache")
            .field("path", &self.path)
            .field("namespaces", &self.read_table().len())
            .finish_non_exhaustive()
    }
}

impl<V: DeserializeOwned> NamespacedCache<V> {
    /// Starts a [`CacheBuilder`] backed by `path`.
    pub fn builder(path: impl Into<PathBuf>) -> CacheBuilder<V> {
        CacheBuilder::new(path)
    }

    /// Opens a cache backed by `path` with default options.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        CacheBuilder::new(path).open()
    }

    /// Opens the cache described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        CacheBuilder::new(config.cache_file.clone())
            .create_if_missing(config.create_if_missing)
            .open()
    }
}

impl<V> NamespacedCache<V> {
    fn read_table(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Namespace<V>>>> {
        self.namespaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Namespace<V>>>> {
        self.namespaces.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn namespace(&self, name: &str) -> Option<Arc<Namespace<V>>> {
        self.read_table().get(name).cloned()
    }

    /// Namespace handles sorted by name, taken without holding any
    /// namespace lock.
    fn sorted_namespaces(&self) -> Vec<(String, Arc<Namespace<V>>)> {
        let mut handles: Vec<_> = self
            .read_table()
            .iter()
            .map(|(name, ns)| (name.clone(), Arc::clone(ns)))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    // == Add Namespace ==
    /// Creates an empty namespace.
    ///
    /// Returns false if `name` already exists; an existing namespace is
    /// never replaced.
    pub fn add_namespace(&self, name: &str) -> bool {
        match self.write_table().entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Namespace::new(HashMap::new())));
                true
            }
        }
    }

    pub fn contains_namespace(&self, name: &str) -> bool {
        self.read_table().contains_key(name)
    }

    /// Returns all namespace names, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_table().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of entries stored in `namespace`, expired ones included.
    pub fn len(&self, namespace: &str) -> Option<usize> {
        self.namespace(namespace).map(|ns| ns.lock().len())
    }

    /// Backing file used by [`NamespacedCache::persist`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let handles = self.sorted_namespaces();
        let total_entries = handles.iter().map(|(_, ns)| ns.lock().len()).sum();
        self.stats.snapshot(handles.len(), total_entries)
    }
}

impl<V: Clone> NamespacedCache<V> {
    // == Get ==
    /// Returns a copy of the live value under (`namespace`, `key`).
    ///
    /// Unknown namespaces, unknown keys and expired entries are all misses.
    /// Expired entries stay in place until overwritten.
    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        self.try_get(namespace, key).ok()
    }

    /// Like [`NamespacedCache::get`] but reports why a lookup missed.
    pub fn try_get(&self, namespace: &str, key: &str) -> Result<V> {
        let result = self.lookup(namespace, key);
        match &result {
            Ok(_) => self.stats.record_hit(),
            Err(CacheError::Expired { .. }) => self.stats.record_expired(),
            Err(_) => self.stats.record_miss(),
        }
        result
    }

    fn lookup(&self, namespace: &str, key: &str) -> Result<V> {
        let ns = self
            .namespace(namespace)
            .ok_or_else(|| CacheError::NamespaceNotFound(namespace.to_string()))?;

        // The lock covers the copy only; expiry is judged after release.
        let entry = ns
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::KeyNotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            })?;

        if entry.is_expired_at(self.clock.now_ms()) {
            return Err(CacheError::Expired {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        Ok(entry.value)
    }

    // == Set ==
    /// Stores a copy of `value` under (`namespace`, `key`) and returns `value`.
    ///
    /// The write time is stamped now and any previous entry for the key is
    /// replaced, expired or not. The namespace must already exist.
    ///
    /// # Arguments
    /// * `namespace` - Existing namespace to write into
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Lifetime from now, [`Ttl::Never`] for no expiry
    pub fn set(&self, namespace: &str, key: &str, value: V, ttl: Ttl) -> Result<V> {
        self.write(namespace, key, value, ttl, "setting cache data")
    }

    // == Add Key ==
    /// Inserts a key. Behaves exactly like [`NamespacedCache::set`].
    pub fn add_key(&self, namespace: &str, key: &str, value: V, ttl: Ttl) -> Result<V> {
        self.write(namespace, key, value, ttl, "adding cache key")
    }

    fn write(&self, namespace: &str, key: &str, value: V, ttl: Ttl, action: &str) -> Result<V> {
        let Some(ns) = self.namespace(namespace) else {
            let err = CacheError::NamespaceNotFound(namespace.to_string());
            self.logger.warn(
                &format!("{action} failed: cache_name({namespace}), key({key})"),
                Some(&err),
            );
            return Err(err);
        };

        {
            let mut entries = ns.lock();
            let entry = CacheEntry::new(value.clone(), ttl, self.clock.now_ms());
            entries.insert(key.to_string(), entry);
        }
        self.stats.record_write();
        Ok(value)
    }
}

impl<V: Clone + Serialize> NamespacedCache<V> {
    // == Persist ==
    /// Writes every entry to the backing file. See [`NamespacedCache::persist_to`].
    pub fn persist(&self) -> Result<usize> {
        self.persist_to(&self.path)
    }

    /// Rewrites `path` with a snapshot of the whole cache.
    ///
    /// Each namespace is copied under its lock and encoded after the lock is
    /// released. Records go to a fresh temp file next to `path`, which is
    /// synced and renamed over `path`; on failure the temp file is removed and
    /// `path` is untouched. Concurrent passes run one after another.
    /// Expired entries are written with their original timestamps.
    ///
    /// Returns the number of records written.
    pub fn persist_to(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        match self.write_snapshot(path) {
            Ok(written) => {
                self.logger.info(
                    &format!("persisted {} records to {}", written, path.display()),
                    None,
                );
                Ok(written)
            }
            Err(err) => {
                self.logger.error("persist cache exception", Some(&err));
                Err(err)
            }
        }
    }

    fn write_snapshot(&self, path: &Path) -> Result<usize> {
        // One pass at a time, so passes finish in the order they snapshot.
        let _pass = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;

        let temp_path = temp.path().to_path_buf();
        let written = self.write_records(temp.as_file_mut(), &temp_path)?;
        temp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(&temp_path, e))?;
        // Dropping an unpersisted temp file deletes it.
        temp.persist(path)
            .map_err(|e| CacheError::io(path, e.error))?;
        Ok(written)
    }

    fn write_records(&self, file: &mut File, temp_path: &Path) -> Result<usize> {
        let io_err = |e: io::Error| CacheError::io(temp_path, e);
        let mut writer = BufWriter::new(file);
        let mut written = 0;

        for (namespace, ns) in self.sorted_namespaces() {
            let entries: BTreeMap<String, CacheEntry<V>> = ns
                .lock()
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect();

            for (key, entry) in &entries {
                let line = encode_record(&namespace, key, entry).map_err(|source| {
                    CacheError::Encode {
                        namespace: namespace.clone(),
                        key: key.clone(),
                        source,
                    }
                })?;
                writeln!(writer, "{line}").map_err(io_err)?;
                written += 1;
            }
        }

        writer.flush().map_err(io_err)?;
        Ok(written)
    }
}
