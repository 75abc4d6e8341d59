//! Ordered, byte-oriented key-value databases on top of a flat string store.
//!
//! `scoped-webstore` exposes a leveldown-style store (put/get/del/batch/clear and
//! range iteration) over any synchronous, string-keyed storage primitive that
//! looks like a browser's `localStorage`: `get_item`, `set_item`,
//! `remove_item`, `len` and `key(index)`. Several logical databases share one
//! physical namespace; each one lives under its own escaped scope prefix.
//!
//! # Layout
//!
//! Every physical key is `escaped_name + "!" + encoded_key`, where the name has
//! each `!` doubled and the key bytes are written in an order-preserving
//! base64 alphabet. Every physical value is a one-character tag followed by
//! the payload:
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `b` | standard base64 of raw bytes |
//! | `s` | literal text |
//! | `n` | nothing, the value was null |
//!
//! # Callbacks
//!
//! All work happens synchronously on the caller's turn; results are delivered
//! through a [`Ticker`], a cooperative single-threaded event queue. A callback
//! never runs before the call that scheduled it has returned.
//!
//! ```
//! use scoped_webstore::{GetOptions, MemoryStorage, Ticker, Value, WebStore};
//! use std::sync::Arc;
//!
//! # fn main() -> scoped_webstore::Result<()> {
//! let ticker = Ticker::new();
//! let db = WebStore::options("tenant1")
//!     .storage(Arc::new(MemoryStorage::new()))
//!     .ticker(ticker.clone())
//!     .build()?;
//!
//! db.put("greeting", "hello", |res| assert!(res.is_ok()));
//! db.get("greeting", GetOptions::text(), |res| {
//!     assert_eq!(res.unwrap(), Value::Text("hello".into()));
//! });
//! ticker.run_until_idle();
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! There are no transactions and no snapshots. Batches and clears are applied
//! one key at a time; an iterator freezes the list of matching keys when it is
//! created but reads values live, silently skipping keys deleted in the
//! meantime and never seeing keys added afterwards.

pub mod batch;
pub mod builder;
pub mod codec;
pub mod database;
pub mod iterator;
pub mod range;
pub mod scope;
pub mod storage;
pub mod store;
pub mod tick;

pub use batch::{BatchOp, ChainedBatch};
pub use builder::{WebStoreOptions, webstore_options};
pub use codec::{Data, Value};
pub use database::{AbstractIterator, AbstractStore, Status, WebStore};
pub use iterator::{Entry, IteratorOptions, StoreIterator};
pub use range::RangeOptions;
pub use scope::Scope;
pub use storage::{LmdbOptions, LmdbStorage, MemoryStorage, Storage, platform_storage};
pub use store::{GetOptions, Store};
pub use tick::{Callback, Ticker};

/// Error type for scoped web store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `get` on a key that holds no value.
    #[error("NotFound")]
    NotFound,

    /// Bad database name, bad key, unavailable backend or misuse of an iterator.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A physical key or value read back from storage is malformed.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failure raised by a storage backend.
    #[error("Storage error: {0}")]
    Backend(String),

    /// Failure raised by the LMDB environment.
    #[error("Heed error: {0}")]
    Heed(#[from] heed::Error),
}

impl Error {
    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Result type alias for scoped web store operations.
pub type Result<T> = std::result::Result<T, Error>;
