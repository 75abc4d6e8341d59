//! Range selection over one scope of a flat store.
//!
//! The physical store cannot answer range queries, so every scan enumerates
//! the whole store, keeps the keys under the scope prefix, filters them
//! against the encoded bounds and sorts what survives. Cost is linear in the
//! total number of physical keys, across every scope.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::{Data, encode_key};
use crate::scope::Scope;
use crate::storage::Storage;
use crate::Result;

/// Bounds of a range query. Every bound is optional.
///
/// `gt`/`gte`/`lt`/`lte` are the usual exclusive and inclusive bounds.
/// `start` and `end` are the legacy inclusive bounds: with `reverse` set,
/// `start` is the upper bound and `end` the lower one. Legacy bounds are
/// applied in addition to the other four, never instead of them. Empty keys
/// are treated as absent bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeOptions {
    pub gt: Option<Data>,
    pub gte: Option<Data>,
    pub lt: Option<Data>,
    pub lte: Option<Data>,
    pub start: Option<Data>,
    pub end: Option<Data>,
    pub reverse: bool,
}

impl RangeOptions {
    /// The full range, ascending.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn gt(mut self, key: impl Into<Data>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn gte(mut self, key: impl Into<Data>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<Data>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<Data>) -> Self {
        self.lte = Some(key.into());
        self
    }

    pub fn start(mut self, key: impl Into<Data>) -> Self {
        self.start = Some(key.into());
        self
    }

    pub fn end(mut self, key: impl Into<Data>) -> Self {
        self.end = Some(key.into());
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Bounds encoded once so candidates compare as plain strings.
#[derive(Debug, Default)]
struct EncodedRange {
    gt: Option<String>,
    gte: Option<String>,
    lt: Option<String>,
    lte: Option<String>,
    start: Option<String>,
    end: Option<String>,
    reverse: bool,
}

fn encode_bound(bound: &Option<Data>) -> Option<String> {
    bound
        .as_ref()
        .filter(|key| !key.is_empty())
        .map(|key| encode_key(key.as_bytes()))
}

impl EncodedRange {
    fn new(options: &RangeOptions) -> Self {
        Self {
            gt: encode_bound(&options.gt),
            gte: encode_bound(&options.gte),
            lt: encode_bound(&options.lt),
            lte: encode_bound(&options.lte),
            start: encode_bound(&options.start),
            end: encode_bound(&options.end),
            reverse: options.reverse,
        }
    }

    fn contains(&self, key: &str) -> bool {
        let below = |bound: &Option<String>, inclusive: bool| match bound {
            Some(bound) if inclusive => key <= bound.as_str(),
            Some(bound) => key < bound.as_str(),
            None => true,
        };
        let above = |bound: &Option<String>, inclusive: bool| match bound {
            Some(bound) if inclusive => key >= bound.as_str(),
            Some(bound) => key > bound.as_str(),
            None => true,
        };

        if !below(&self.lt, false) || !below(&self.lte, true) {
            return false;
        }
        if !above(&self.gt, false) || !above(&self.gte, true) {
            return false;
        }

        if self.reverse {
            below(&self.start, true) && above(&self.end, true)
        } else {
            above(&self.start, true) && below(&self.end, true)
        }
    }
}

/// Encoded keys of `scope` matching `options`, sorted ascending or, with
/// `reverse`, descending.
///
/// The result reflects the store at the moment of the call and is never
/// refreshed.
pub fn matching_keys(storage: &dyn Storage, scope: &Scope, options: &RangeOptions) -> Result<Vec<String>> {
    let range = EncodedRange::new(options);
    let physical_keys = storage.keys()?;
    let length = physical_keys.len();
    let mut keys = Vec::new();

    for physical_key in &physical_keys {
        if let Some(encoded) = scope.strip(physical_key) {
            if range.contains(encoded) {
                keys.push(encoded.to_owned());
            }
        }
    }

    keys.sort_unstable();
    if range.reverse {
        keys.reverse();
    }

    trace!(target: "scoped_webstore::range", scope = scope.name(), scanned = length, matched = keys.len(), "Computed matching keys");
    Ok(keys)
}
