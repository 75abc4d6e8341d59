use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

use crate::batch::{BatchOp, ChainedBatch};
use crate::builder::WebStoreOptions;
use crate::codec::{Data, Value};
use crate::iterator::{Entry, IteratorOptions, StoreIterator};
use crate::range::RangeOptions;
use crate::storage::Storage;
use crate::store::{GetOptions, Store};
use crate::tick::{Callback, Ticker};
use crate::Result;

/// The callback-based store contract.
///
/// Every method reports through its callback exactly once, on a later tick,
/// with either a result or an error.
pub trait AbstractStore {
    type Iterator: AbstractIterator;

    fn open(&self, callback: Callback<()>);
    fn close(&self, callback: Callback<()>);
    fn put(&self, key: Data, value: Value, callback: Callback<()>);
    fn get(&self, key: Data, options: GetOptions, callback: Callback<Value>);
    fn del(&self, key: Data, callback: Callback<()>);
    fn batch(&self, operations: Vec<BatchOp>, callback: Callback<()>);
    fn clear(&self, options: RangeOptions, callback: Callback<()>);
    fn iterator(&self, options: IteratorOptions) -> Result<Self::Iterator>;
}

/// The callback-based iterator contract.
pub trait AbstractIterator {
    fn next(&self, callback: Callback<Option<Entry>>);
    fn end(&self, callback: Callback<()>);
}

/// Lifecycle of a [`WebStore`] handle. Purely informational: there is no
/// connection, so operations work in every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    Open,
    Closed,
}

/// A logical database with callback delivery.
///
/// Handles are cheap to clone; clones share the store, the ticker and the
/// status.
#[derive(Clone)]
pub struct WebStore {
    store: Store,
    ticker: Ticker,
    status: Rc<Cell<Status>>,
}

impl fmt::Debug for WebStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebStore")
            .field("scope", &self.store.scope().name())
            .field("status", &self.status.get())
            .finish()
    }
}

impl WebStore {
    /// Start configuring a database named `name`.
    pub fn options(name: &str) -> WebStoreOptions {
        WebStoreOptions::new(name)
    }

    /// A database on explicit storage, with its own ticker.
    pub fn new(name: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        Self::with_ticker(name, storage, Ticker::new())
    }

    pub fn with_ticker(name: &str, storage: Arc<dyn Storage>, ticker: Ticker) -> Result<Self> {
        let store = Store::new(name, storage)?;
        debug!(target: "scoped_webstore::database", scope = name, prefix = store.scope().prefix(), "Created database handle");
        Ok(Self {
            store,
            ticker,
            status: Rc::new(Cell::new(Status::New)),
        })
    }

    /// The synchronous adapter behind this handle.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn open(&self, callback: impl FnOnce(Result<()>) + 'static) {
        self.status.set(Status::Open);
        debug!(target: "scoped_webstore::database", scope = self.store.scope().name(), "Opened");
        self.ticker.resolve(Ok(()), callback);
    }

    pub fn close(&self, callback: impl FnOnce(Result<()>) + 'static) {
        self.status.set(Status::Closed);
        debug!(target: "scoped_webstore::database", scope = self.store.scope().name(), "Closed");
        self.ticker.resolve(Ok(()), callback);
    }

    pub fn put(
        &self,
        key: impl Into<Data>,
        value: impl Into<Value>,
        callback: impl FnOnce(Result<()>) + 'static,
    ) {
        let (key, value) = (key.into(), value.into());
        self.ticker.run(|| self.store.put(&key, &value), callback);
    }

    pub fn get(
        &self,
        key: impl Into<Data>,
        options: GetOptions,
        callback: impl FnOnce(Result<Value>) + 'static,
    ) {
        let key = key.into();
        self.ticker.run(|| self.store.get(&key, &options), callback);
    }

    pub fn del(&self, key: impl Into<Data>, callback: impl FnOnce(Result<()>) + 'static) {
        let key = key.into();
        self.ticker.run(|| self.store.del(&key), callback);
    }

    pub fn batch(&self, operations: Vec<BatchOp>, callback: impl FnOnce(Result<()>) + 'static) {
        self.ticker.run(|| self.store.batch(&operations), callback);
    }

    /// Buffer operations and submit them later as one batch.
    pub fn chained_batch(&self) -> ChainedBatch {
        ChainedBatch::new(self.clone())
    }

    /// Remove every key in the range; the default options cover the whole
    /// database. Other databases on the same storage are untouched.
    pub fn clear(&self, options: RangeOptions, callback: impl FnOnce(Result<()>) + 'static) {
        self.ticker
            .run(|| self.store.clear(&options).map(|_| ()), callback);
    }

    /// Create an iterator. The matching keys are computed now.
    pub fn iterator(&self, options: IteratorOptions) -> Result<StoreIterator> {
        StoreIterator::new(&self.store, self.ticker.clone(), &options)
    }
}

impl AbstractStore for WebStore {
    type Iterator = StoreIterator;

    fn open(&self, callback: Callback<()>) {
        WebStore::open(self, callback)
    }

    fn close(&self, callback: Callback<()>) {
        WebStore::close(self, callback)
    }

    fn put(&self, key: Data, value: Value, callback: Callback<()>) {
        WebStore::put(self, key, value, callback)
    }

    fn get(&self, key: Data, options: GetOptions, callback: Callback<Value>) {
        WebStore::get(self, key, options, callback)
    }

    fn del(&self, key: Data, callback: Callback<()>) {
        WebStore::del(self, key, callback)
    }

    fn batch(&self, operations: Vec<BatchOp>, callback: Callback<()>) {
        WebStore::batch(self, operations, callback)
    }

    fn clear(&self, options: RangeOptions, callback: Callback<()>) {
        WebStore::clear(self, options, callback)
    }

    fn iterator(&self, options: IteratorOptions) -> Result<StoreIterator> {
        WebStore::iterator(self, options)
    }
}

impl AbstractIterator for StoreIterator {
    fn next(&self, callback: Callback<Option<Entry>>) {
        StoreIterator::next(self, callback)
    }

    fn end(&self, callback: Callback<()>) {
        StoreIterator::end(self, callback)
    }
}
