use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::{trace, warn};

use crate::codec::{self, Data, Value};
use crate::range::RangeOptions;
use crate::store::Store;
use crate::tick::{Callback, Ticker};
use crate::{Error, Result};

/// Options for [`WebStore::iterator`](crate::WebStore::iterator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IteratorOptions {
    #[serde(flatten)]
    pub range: RangeOptions,
    /// Maximum number of entries to yield. `None` means no limit.
    pub limit: Option<usize>,
    /// Report keys. When `false` every entry's key is `None`.
    pub keys: bool,
    /// Report values. When `false` every entry's value is `None` and the
    /// store is never read for values.
    pub values: bool,
    pub key_as_buffer: bool,
    pub value_as_buffer: bool,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            range: RangeOptions::default(),
            limit: None,
            keys: true,
            values: true,
            key_as_buffer: true,
            value_as_buffer: true,
        }
    }
}

impl IteratorOptions {
    pub fn new(range: RangeOptions) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys(mut self, keys: bool) -> Self {
        self.keys = keys;
        self
    }

    pub fn values(mut self, values: bool) -> Self {
        self.values = values;
        self
    }

    /// Decode both keys and values as text.
    pub fn text(mut self) -> Self {
        self.key_as_buffer = false;
        self.value_as_buffer = false;
        self
    }

    pub fn key_as_buffer(mut self, as_buffer: bool) -> Self {
        self.key_as_buffer = as_buffer;
        self
    }

    pub fn value_as_buffer(mut self, as_buffer: bool) -> Self {
        self.value_as_buffer = as_buffer;
        self
    }
}

/// One iteration step. Excluded fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Option<Data>,
    pub value: Option<Value>,
}

struct Cursor {
    store: Store,
    keys: Vec<String>,
    pos: usize,
    count: usize,
    limit: Option<usize>,
    include_keys: bool,
    include_values: bool,
    key_as_buffer: bool,
    value_as_buffer: bool,
    nexting: bool,
    ended: bool,
    waiting: VecDeque<Callback<Option<Entry>>>,
}

impl Cursor {
    fn exhausted(&self) -> bool {
        self.pos >= self.keys.len() || self.limit.is_some_and(|limit| self.count >= limit)
    }

    /// Advance to the next live entry, or `None` at the end.
    fn step(&mut self) -> Result<Option<Entry>> {
        while !self.exhausted() {
            let encoded = &self.keys[self.pos];
            self.pos += 1;

            let value = if self.include_values {
                match self.store.read_encoded(encoded)? {
                    Some(raw) => Some(codec::decode_value(&raw, self.value_as_buffer)?),
                    None => {
                        trace!(target: "scoped_webstore::iterator", scope = self.store.scope().name(), key = %encoded, "Skipping entry removed since the scan");
                        continue;
                    }
                }
            } else {
                None
            };

            let key = if self.include_keys {
                Some(codec::decode_key(encoded, self.key_as_buffer)?)
            } else {
                None
            };

            self.count += 1;
            return Ok(Some(Entry { key, value }));
        }
        Ok(None)
    }
}

/// A cursor over a range of one logical database.
///
/// The matching keys are computed once, when the iterator is created. Values
/// are read when each entry is reached: an entry removed in the meantime is
/// skipped, and keys added after creation are never seen, even inside the
/// range. There is no snapshot.
///
/// `next` calls are serialized. A call made while an earlier one is still
/// waiting for delivery is queued and only starts once that delivery has
/// returned. After the last entry every `next` yields `Ok(None)`.
#[derive(Clone)]
pub struct StoreIterator {
    cursor: Rc<RefCell<Cursor>>,
    ticker: Ticker,
}

impl StoreIterator {
    pub(crate) fn new(store: &Store, ticker: Ticker, options: &IteratorOptions) -> Result<Self> {
        let keys = store.keys(&options.range)?;
        let cursor = Cursor {
            store: store.clone(),
            keys,
            pos: 0,
            count: 0,
            limit: options.limit,
            include_keys: options.keys,
            include_values: options.values,
            key_as_buffer: options.key_as_buffer,
            value_as_buffer: options.value_as_buffer,
            nexting: false,
            ended: false,
            waiting: VecDeque::new(),
        };
        Ok(Self {
            cursor: Rc::new(RefCell::new(cursor)),
            ticker,
        })
    }

    /// Number of keys frozen at creation, including ones already visited.
    pub fn frozen_len(&self) -> usize {
        self.cursor.borrow().keys.len()
    }

    /// Deliver the next entry, or `None` once the range or limit is exhausted.
    pub fn next(&self, callback: impl FnOnce(Result<Option<Entry>>) + 'static) {
        let mut cursor = self.cursor.borrow_mut();
        if cursor.ended {
            drop(cursor);
            self.ticker.resolve(
                Err(Error::InvalidArgument("cannot call next() after end()".into())),
                callback,
            );
            return;
        }
        if cursor.nexting || !cursor.waiting.is_empty() {
            cursor.waiting.push_back(Box::new(callback));
            return;
        }
        drop(cursor);
        Self::start(&self.cursor, &self.ticker, Box::new(callback));
    }

    fn start(cursor: &Rc<RefCell<Cursor>>, ticker: &Ticker, callback: Callback<Option<Entry>>) {
        let outcome = {
            let mut state = cursor.borrow_mut();
            state.nexting = true;
            state.step()
        };
        if let Err(e) = &outcome {
            warn!(target: "scoped_webstore::iterator", error = %e, "Iterator step failed");
        }

        let cursor = cursor.clone();
        let next_ticker = ticker.clone();
        ticker.defer(move || {
            cursor.borrow_mut().nexting = false;
            callback(outcome);

            // Calls queued while this one was pending go next, ahead of any
            // call the callback itself just made.
            let queued = {
                let mut state = cursor.borrow_mut();
                if state.nexting { None } else { state.waiting.pop_front() }
            };
            if let Some(queued) = queued {
                Self::start(&cursor, &next_ticker, queued);
            }
        });
    }

    /// Release the iterator. Later `next` calls fail, and so do calls still
    /// queued behind a pending one.
    pub fn end(&self, callback: impl FnOnce(Result<()>) + 'static) {
        let (outcome, abandoned) = {
            let mut cursor = self.cursor.borrow_mut();
            if cursor.ended {
                (
                    Err(Error::InvalidArgument("end() already called on iterator".into())),
                    VecDeque::new(),
                )
            } else {
                cursor.ended = true;
                cursor.keys = Vec::new();
                (Ok(()), std::mem::take(&mut cursor.waiting))
            }
        };

        for waiting in abandoned {
            self.ticker.resolve(
                Err(Error::InvalidArgument("iterator ended before next() ran".into())),
                waiting,
            );
        }
        self.ticker.resolve(outcome, callback);
    }
}

impl fmt::Debug for StoreIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursor = self.cursor.borrow();
        f.debug_struct("StoreIterator")
            .field("scope", &cursor.store.scope().name())
            .field("pos", &cursor.pos)
            .field("keys", &cursor.keys.len())
            .field("count", &cursor.count)
            .field("ended", &cursor.ended)
            .finish()
    }
}
