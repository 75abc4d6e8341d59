//! The flat, synchronous, string-keyed storage primitive everything is built on.
//!
//! [`Storage`] mirrors the web storage interface. Two implementations ship with
//! the crate: [`MemoryStorage`] for in-process use and [`LmdbStorage`], which
//! persists the flat namespace in a single LMDB database through heed.

use heed::types::Str;
use heed::{Database as HeedDatabase, Env, EnvOpenOptions};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::{Error, Result};

/// Environment variable naming the directory of the platform store.
pub const PLATFORM_DIR_VAR: &str = "SCOPED_WEBSTORE_DIR";
/// Environment variable overriding the platform store's LMDB map size, in bytes.
pub const PLATFORM_MAP_SIZE_VAR: &str = "SCOPED_WEBSTORE_MAP_SIZE";

const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;
const DEFAULT_DB_NAME: &str = "webstorage";

/// A flat string-keyed store.
///
/// All methods are synchronous. `key(index)` enumerates the stored keys in an
/// implementation-defined order that is stable as long as nothing is written;
/// it returns `None` once `index >= len()`.
pub trait Storage: fmt::Debug + Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    fn len(&self) -> Result<usize>;

    fn key(&self, index: usize) -> Result<Option<String>>;

    /// Every stored key, in `key(index)` order.
    ///
    /// The default walks `key(index)`; backends that can enumerate in one
    /// pass should override it so full scans stay linear.
    fn keys(&self) -> Result<Vec<String>> {
        let length = self.len()?;
        let mut keys = Vec::with_capacity(length);
        for index in 0..length {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-process storage. Keys enumerate in string order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.items.read().len())
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        Ok(self.items.read().keys().nth(index).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

/// Options for opening an [`LmdbStorage`].
#[derive(Debug, Clone)]
pub struct LmdbOptions {
    pub path: PathBuf,
    pub map_size: usize,
    /// Name of the LMDB database holding the flat namespace.
    pub name: String,
}

impl LmdbOptions {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            map_size: DEFAULT_MAP_SIZE,
            name: DEFAULT_DB_NAME.to_owned(),
        }
    }

    pub fn map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Read the platform store location from the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `SCOPED_WEBSTORE_DIR` is unset or
    /// the map size override does not parse.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(PLATFORM_DIR_VAR)
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| Error::InvalidArgument("persistent storage is not available".into()))?;
        let mut options = Self::new(path);

        if let Ok(raw) = std::env::var(PLATFORM_MAP_SIZE_VAR) {
            options.map_size = raw.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!("{} is not a byte count: {:?}", PLATFORM_MAP_SIZE_VAR, raw))
            })?;
        }
        Ok(options)
    }
}

/// Persistent storage backed by one LMDB database of string keys and values.
///
/// Every call runs in its own transaction, so each write is durable on its
/// own and nothing spans more than one key. LMDB limits keys to 511 bytes.
pub struct LmdbStorage {
    env: Env,
    db: HeedDatabase<Str, Str>,
}

impl fmt::Debug for LmdbStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmdbStorage")
            .field("path", &self.env.path())
            .finish_non_exhaustive()
    }
}

impl LmdbStorage {
    /// Open (creating if needed) the environment directory and database.
    pub fn open(options: &LmdbOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.path).map_err(|e| {
            Error::Backend(format!("cannot create {}: {}", options.path.display(), e))
        })?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(options.map_size)
                .max_dbs(1)
                .open(&options.path)?
        };

        let mut wtxn = env.write_txn()?;
        let db = env
            .database_options()
            .types::<Str, Str>()
            .name(&options.name)
            .create(&mut wtxn)?;
        wtxn.commit()?;

        debug!(target: "scoped_webstore::storage", path = %options.path.display(), name = %options.name, "Opened LMDB storage");
        Ok(Self { env, db })
    }
}

impl Storage for LmdbStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.get(&rtxn, key)?.map(str::to_owned))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.len(&rtxn)? as usize)
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        let rtxn = self.env.read_txn()?;
        let mut iter = self.db.iter(&rtxn)?;
        match iter.nth(index) {
            Some(entry) => {
                let (key, _) = entry?;
                Ok(Some(key.to_owned()))
            }
            None => Ok(None),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let rtxn = self.env.read_txn()?;
        let mut keys = Vec::with_capacity(self.db.len(&rtxn)? as usize);
        for entry in self.db.iter(&rtxn)? {
            let (key, _) = entry?;
            keys.push(key.to_owned());
        }
        Ok(keys)
    }
}

static PLATFORM: OnceCell<Arc<LmdbStorage>> = OnceCell::new();

/// The ambient persistent store, shared by every database in the process.
///
/// Opened on first use from [`LmdbOptions::from_env`].
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if no platform store is configured.
pub fn platform_storage() -> Result<Arc<dyn Storage>> {
    let storage = PLATFORM.get_or_try_init(|| {
        let options = LmdbOptions::from_env()?;
        LmdbStorage::open(&options).map(Arc::new)
    })?;
    Ok(storage.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &dyn Storage) -> Result<()> {
        assert!(storage.is_empty()?);
        storage.set_item("b", "2")?;
        storage.set_item("a", "1")?;
        storage.set_item("a", "one")?;

        assert_eq!(storage.len()?, 2);
        assert_eq!(storage.get_item("a")?, Some("one".to_string()));
        assert_eq!(storage.get_item("missing")?, None);

        let mut keys: Vec<String> = (0..storage.len()?)
            .filter_map(|i| storage.key(i).transpose())
            .collect::<Result<_>>()?;
        assert_eq!(storage.keys()?, keys);
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(storage.key(2)?, None);

        storage.remove_item("a")?;
        storage.remove_item("a")?;
        assert_eq!(storage.len()?, 1);
        assert_eq!(storage.get_item("a")?, None);
        Ok(())
    }

    #[test]
    fn test_memory_storage() -> Result<()> {
        exercise(&MemoryStorage::new())
    }

    #[test]
    fn test_lmdb_storage() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let storage = LmdbStorage::open(&LmdbOptions::new(dir.path()).map_size(10 * 1024 * 1024))?;
        exercise(&storage)
    }

    #[test]
    fn test_lmdb_storage_persists() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let options = LmdbOptions::new(dir.path()).name("persist");
        {
            let storage = LmdbStorage::open(&options)?;
            storage.set_item("k", "v")?;
        }
        let storage = LmdbStorage::open(&options)?;
        assert_eq!(storage.get_item("k")?, Some("v".to_string()));
        Ok(())
    }
}
