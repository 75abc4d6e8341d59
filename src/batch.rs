use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::{Data, Value};
use crate::database::WebStore;
use crate::Result;

/// One operation of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchOp {
    Put { key: Data, value: Value },
    Del { key: Data },
}

impl BatchOp {
    pub fn put(key: impl Into<Data>, value: impl Into<Value>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn del(key: impl Into<Data>) -> Self {
        BatchOp::Del { key: key.into() }
    }

    pub fn key(&self) -> &Data {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Del { key } => key,
        }
    }
}

/// Builder that buffers operations and submits them as one batch.
///
/// Nothing touches storage until [`ChainedBatch::write`]; keys are validated
/// then, together.
#[derive(Debug)]
pub struct ChainedBatch {
    db: WebStore,
    operations: Vec<BatchOp>,
}

impl ChainedBatch {
    pub(crate) fn new(db: WebStore) -> Self {
        Self {
            db,
            operations: Vec::new(),
        }
    }

    pub fn put(&mut self, key: impl Into<Data>, value: impl Into<Value>) -> &mut Self {
        self.operations.push(BatchOp::put(key, value));
        self
    }

    pub fn del(&mut self, key: impl Into<Data>) -> &mut Self {
        self.operations.push(BatchOp::del(key));
        self
    }

    /// Drop every buffered operation.
    pub fn clear(&mut self) -> &mut Self {
        self.operations.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BatchOp] {
        &self.operations
    }

    /// Submit the buffered operations.
    pub fn write(self, callback: impl FnOnce(Result<()>) + 'static) {
        trace!(target: "scoped_webstore::batch", scope = self.db.store().scope().name(), operations = self.operations.len(), "Writing chained batch");
        self.db.batch(self.operations, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_op_key() {
        assert_eq!(BatchOp::put("a", "1").key(), &Data::Text("a".into()));
        assert_eq!(BatchOp::del(b"b").key(), &Data::Bytes(b"b".to_vec()));
    }

    #[test]
    fn test_batch_op_from_json() {
        let ops: Vec<BatchOp> = serde_json::from_str(
            r#"[
                {"type": "put", "key": {"Text": "a"}, "value": {"Text": "1"}},
                {"type": "del", "key": {"Text": "b"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(ops, vec![BatchOp::put("a", "1"), BatchOp::del("b")]);
    }
}
