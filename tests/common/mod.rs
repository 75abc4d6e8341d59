#![allow(dead_code)]

use scoped_webstore::{
    Entry, IteratorOptions, LmdbOptions, LmdbStorage, MemoryStorage, Result, Storage, StoreIterator,
    Ticker, WebStore,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Issue one callback-style operation and drive the ticker until it reports.
pub fn wait<T: 'static>(ticker: &Ticker, start: impl FnOnce(Box<dyn FnOnce(Result<T>)>)) -> Result<T> {
    let slot = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    start(Box::new(move |res| *sink.borrow_mut() = Some(res)));
    ticker.run_until_idle();
    let outcome = slot.borrow_mut().take();
    outcome.expect("callback was not called")
}

pub fn next(it: &StoreIterator, ticker: &Ticker) -> Result<Option<Entry>> {
    wait(ticker, |cb| it.next(cb))
}

/// Drain an iterator into `(key, value)` text pairs.
pub fn collect_text(db: &WebStore, options: IteratorOptions) -> Result<Vec<(String, String)>> {
    let it = db.iterator(options.text())?;
    let mut entries = Vec::new();
    while let Some(entry) = next(&it, db.ticker())? {
        entries.push((text(entry.key), text(entry.value)));
    }
    Ok(entries)
}

pub fn text<T: Into<scoped_webstore::Value>>(field: Option<T>) -> String {
    match field.map(Into::<scoped_webstore::Value>::into) {
        Some(scoped_webstore::Value::Text(text)) => text,
        Some(scoped_webstore::Value::Bytes(bytes)) => String::from_utf8(bytes).unwrap(),
        Some(scoped_webstore::Value::Null) => "<null>".to_string(),
        None => "<none>".to_string(),
    }
}

pub fn memory_db(name: &str, storage: &Arc<MemoryStorage>, ticker: &Ticker) -> WebStore {
    WebStore::options(name)
        .storage(storage.clone())
        .ticker(ticker.clone())
        .build()
        .unwrap()
}

pub fn put_all(db: &WebStore, pairs: &[(&str, &str)]) {
    for (key, value) in pairs {
        wait(db.ticker(), |cb| db.put(*key, *value, cb)).unwrap();
    }
}

/// Route library logs through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// LMDB storage in a temporary directory, removed on drop.
pub struct TestEnv {
    pub storage: Arc<LmdbStorage>,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let storage = LmdbStorage::open(&LmdbOptions::new(dir.path()).map_size(10 * 1024 * 1024))?;
        Ok(TestEnv {
            storage: Arc::new(storage),
            _dir: dir,
        })
    }
}

/// Memory storage that counts reads and can be told to fail writes to one key.
#[derive(Debug, Default)]
pub struct InstrumentedStorage {
    inner: MemoryStorage,
    reads: AtomicUsize,
    fail_on: Mutex<Option<String>>,
}

impl InstrumentedStorage {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_writes_to(&self, physical_key: &str) {
        *self.fail_on.lock().unwrap() = Some(physical_key.to_string());
    }
}

impl Storage for InstrumentedStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_on.lock().unwrap().as_deref() == Some(key) {
            return Err(scoped_webstore::Error::Backend(format!("quota exceeded writing {}", key)));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key)
    }

    fn len(&self) -> Result<usize> {
        self.inner.len()
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        self.inner.key(index)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }
}
