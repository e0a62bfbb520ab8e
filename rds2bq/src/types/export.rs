use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Location of an object in object storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Per-table status document written by a completed export.
///
/// An export may write several of these documents. Merged documents keep the top-level
/// fields of the first one and the table records of all of them, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportStatusDocument {
    #[serde(rename = "perTableStatus")]
    pub per_table_status: Vec<TableExportRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExportStatusDocument {
    pub fn from_records(records: Vec<TableExportRecord>) -> Self {
        Self {
            per_table_status: records,
            extra: Map::new(),
        }
    }

    /// Appends the table records of `other` after the records of `self`.
    pub fn append(&mut self, other: ExportStatusDocument) {
        self.per_table_status.extend(other.per_table_status);
    }
}

/// Status of a single exported table.
///
/// Only `target` is interpreted; size and status fields are kept opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExportRecord {
    pub target: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableExportRecord {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            extra: Map::new(),
        }
    }
}
