//! Result cache keyed by (game, inverse alpha).
//!
//! A miss runs the producer, which persists the record itself; the cache then
//! re-reads the store and returns what is stored, never the producer's own
//! view of the result.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::config::Paths;
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;
use crate::record::ExperimentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub game: GameKind,
    pub inverse_alpha: u32,
}

impl CacheKey {
    pub fn new(game: GameKind, inverse_alpha: u32) -> Self {
        CacheKey { game, inverse_alpha }
    }

    /// Artifact file name, e.g. `kuhn_poker%10.json`.
    pub fn file_name(&self) -> String {
        format!("{}%{}.json", self.game.file_name(), self.inverse_alpha)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 1/alpha={}", self.game, self.inverse_alpha)
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Backend holding one record per key.
pub trait ResultStore: Send + Sync {
    /// Human-readable location of `key`, used in error messages.
    fn location(&self, key: &CacheKey) -> String;

    /// `Ok(None)` when nothing is stored for `key`.
    fn load(&self, key: &CacheKey) -> MmdResult<Option<ExperimentRecord>>;

    /// Persist `record` as a single complete write.
    fn store(&self, key: &CacheKey, record: &ExperimentRecord) -> MmdResult<()>;

    /// Exclusive claim on `key` for the duration of a computation.
    fn claim(&self, _key: &CacheKey) -> MmdResult<Option<KeyLock>> {
        Ok(None)
    }
}

impl<S: ResultStore + ?Sized> ResultStore for &S {
    fn location(&self, key: &CacheKey) -> String {
        (**self).location(key)
    }

    fn load(&self, key: &CacheKey) -> MmdResult<Option<ExperimentRecord>> {
        (**self).load(key)
    }

    fn store(&self, key: &CacheKey, record: &ExperimentRecord) -> MmdResult<()> {
        (**self).store(key, record)
    }

    fn claim(&self, key: &CacheKey) -> MmdResult<Option<KeyLock>> {
        (**self).claim(key)
    }
}

/// JSON records under `<data>/mmd/`.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(paths: &Paths) -> Self {
        DiskStore {
            dir: paths.results_dir(),
        }
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ResultStore for DiskStore {
    fn location(&self, key: &CacheKey) -> String {
        self.path(key).display().to_string()
    }

    fn load(&self, key: &CacheKey) -> MmdResult<Option<ExperimentRecord>> {
        let path = self.path(key);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: ExperimentRecord =
            serde_json::from_str(&json).map_err(|e| MmdError::MalformedData {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        check_key(key, &record, || path.clone())?;
        Ok(Some(record))
    }

    fn store(&self, key: &CacheKey, record: &ExperimentRecord) -> MmdResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension(format!("json.tmp{}", std::process::id()));
        std::fs::write(&tmp, serde_json::to_string(record)?)?;
        // Readers see either no file or a complete one.
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn claim(&self, key: &CacheKey) -> MmdResult<Option<KeyLock>> {
        std::fs::create_dir_all(&self.dir)?;
        let lock_path = self.path(key).with_extension("json.lock");
        KeyLock::acquire(&lock_path).map(Some)
    }
}

/// Records held in memory; shares nothing across processes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<CacheKey, ExperimentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> MmdResult<usize> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> MmdResult<bool> {
        Ok(self.len()? == 0)
    }

    fn records(&self) -> MmdResult<MutexGuard<'_, HashMap<CacheKey, ExperimentRecord>>> {
        self.records
            .lock()
            .map_err(|_| MmdError::Pool("result store lock poisoned".to_string()))
    }
}

impl ResultStore for MemoryStore {
    fn location(&self, key: &CacheKey) -> String {
        format!("memory://{}", key.file_name())
    }

    fn load(&self, key: &CacheKey) -> MmdResult<Option<ExperimentRecord>> {
        let records = self.records()?;
        match records.get(key) {
            Some(record) => {
                check_key(key, record, || PathBuf::from(self.location(key)))?;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn store(&self, key: &CacheKey, record: &ExperimentRecord) -> MmdResult<()> {
        self.records()?.insert(*key, record.clone());
        Ok(())
    }
}

fn check_key(
    key: &CacheKey,
    record: &ExperimentRecord,
    path: impl FnOnce() -> PathBuf,
) -> MmdResult<()> {
    if record.inverse_alpha != key.inverse_alpha {
        return Err(MmdError::MalformedData {
            path: path(),
            detail: format!(
                "record is for inverse alpha {}, expected {}",
                record.inverse_alpha, key.inverse_alpha
            ),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Key lock
// ---------------------------------------------------------------------------

/// Lock directory next to a cache artifact. Creating a directory is atomic, so
/// two batches cannot both own a key. Removed on drop.
#[derive(Debug)]
pub struct KeyLock {
    path: PathBuf,
}

impl KeyLock {
    pub fn acquire(path: &Path) -> MmdResult<Self> {
        match std::fs::create_dir(path) {
            Ok(()) => Ok(KeyLock {
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(MmdError::KeyBusy {
                location: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir(&self.path);
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

pub struct ExperimentCache<S: ResultStore> {
    store: S,
}

impl<S: ResultStore> ExperimentCache<S> {
    pub fn new(store: S) -> Self {
        ExperimentCache { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored record for `key` if there is one; never computes.
    pub fn get(&self, key: &CacheKey) -> MmdResult<Option<ExperimentRecord>> {
        self.store.load(key)
    }

    /// Stored record for `key`, running `producer` first on a miss.
    ///
    /// `producer` must persist its result to this cache's store. A producer
    /// that succeeds without leaving a readable record is a failure.
    pub fn get_or_compute<F>(&self, key: &CacheKey, producer: F) -> MmdResult<ExperimentRecord>
    where
        F: FnOnce() -> MmdResult<()>,
    {
        if let Some(record) = self.store.load(key)? {
            log::debug!("{}: cache hit", key);
            return Ok(record);
        }

        let _lock = self.store.claim(key)?;
        // Another batch may have finished between the lookup and the claim.
        if let Some(record) = self.store.load(key)? {
            log::debug!("{}: filled while waiting for claim", key);
            return Ok(record);
        }

        log::info!("{}: cache miss, computing", key);
        producer()?;

        self.store.load(key)?.ok_or_else(|| MmdError::ProducerFailure {
            command: key.to_string(),
            reason: format!("no readable result at {}", self.store.location(key)),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
