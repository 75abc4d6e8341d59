use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::batch::BatchOp;
use crate::codec::{self, Data, Value};
use crate::range::{self, RangeOptions};
use crate::scope::Scope;
use crate::storage::Storage;
use crate::{Error, Result};

/// Options for `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOptions {
    /// Return bytes (`true`) or text (`false`).
    pub as_buffer: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self { as_buffer: true }
    }
}

impl GetOptions {
    pub fn bytes() -> Self {
        Self { as_buffer: true }
    }

    pub fn text() -> Self {
        Self { as_buffer: false }
    }
}

/// Synchronous adapter for one logical database.
///
/// Translates store semantics onto the flat storage: puts always overwrite,
/// deletes of missing keys succeed, and a missing key on `get` is
/// `Error::NotFound`. Only physical keys under this store's scope prefix are
/// ever read, written or removed.
///
/// Cloning is cheap; clones share the same storage.
#[derive(Debug, Clone)]
pub struct Store {
    scope: Scope,
    storage: Arc<dyn Storage>,
}

impl Store {
    /// Bind a database name to a storage backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the name is empty.
    pub fn new(name: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        Ok(Self {
            scope: Scope::named(name)?,
            storage,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn physical_key(&self, key: &Data) -> Result<String> {
        check_key(key)?;
        Ok(self.scope.physical_key(&codec::encode_key(key.as_bytes())))
    }

    /// Insert or overwrite a value.
    pub fn put(&self, key: &Data, value: &Value) -> Result<()> {
        let physical_key = self.physical_key(key)?;
        trace!(target: "scoped_webstore::store", scope = self.scope.name(), key = %physical_key, "put");
        self.storage.set_item(&physical_key, &codec::encode_value(value))
    }

    /// Read a value, decoded as bytes or text per `options`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key holds no value, or
    /// `Error::Decode` if the stored value is malformed.
    pub fn get(&self, key: &Data, options: &GetOptions) -> Result<Value> {
        let physical_key = self.physical_key(key)?;
        let raw = self.storage.get_item(&physical_key)?.ok_or(Error::NotFound)?;
        codec::decode_value(&raw, options.as_buffer)
    }

    /// Remove a key. Removing a missing key succeeds.
    pub fn del(&self, key: &Data) -> Result<()> {
        let physical_key = self.physical_key(key)?;
        trace!(target: "scoped_webstore::store", scope = self.scope.name(), key = %physical_key, "del");
        self.storage.remove_item(&physical_key)
    }

    /// Apply operations in order.
    ///
    /// Every key is validated before anything is written. After that the
    /// batch is not atomic: if the backend fails partway, the operations
    /// before the failing one stay applied.
    pub fn batch(&self, operations: &[BatchOp]) -> Result<()> {
        let resolved = operations
            .iter()
            .map(|op| self.physical_key(op.key()).map(|physical| (physical, op)))
            .collect::<Result<Vec<_>>>()?;

        for (physical_key, op) in &resolved {
            match op {
                BatchOp::Put { value, .. } => {
                    self.storage.set_item(physical_key, &codec::encode_value(value))?
                }
                BatchOp::Del { .. } => self.storage.remove_item(physical_key)?,
            }
        }

        debug!(target: "scoped_webstore::store", scope = self.scope.name(), operations = resolved.len(), "Batch applied");
        Ok(())
    }

    /// Remove every key in the range. Returns how many keys were removed.
    ///
    /// Keys are selected once and then removed one by one; keys written into
    /// the range during the call may or may not survive.
    pub fn clear(&self, options: &RangeOptions) -> Result<usize> {
        let keys = self.keys(options)?;
        for encoded in &keys {
            self.storage.remove_item(&self.scope.physical_key(encoded))?;
        }

        debug!(target: "scoped_webstore::store", scope = self.scope.name(), removed = keys.len(), "Cleared range");
        Ok(keys.len())
    }

    /// Encoded keys in the range, in iteration order.
    pub fn keys(&self, options: &RangeOptions) -> Result<Vec<String>> {
        range::matching_keys(self.storage.as_ref(), &self.scope, options)
    }

    /// Raw stored value for an already encoded key.
    pub(crate) fn read_encoded(&self, encoded_key: &str) -> Result<Option<String>> {
        self.storage.get_item(&self.scope.physical_key(encoded_key))
    }
}

fn check_key(key: &Data) -> Result<()> {
    if key.is_empty() {
        let kind = match key {
            Data::Bytes(_) => "Buffer",
            Data::Text(_) => "String",
        };
        return Err(Error::InvalidArgument(format!("key cannot be an empty {}", kind)));
    }
    Ok(())
}
