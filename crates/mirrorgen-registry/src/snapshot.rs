//! In-memory model of a registry index snapshot.
//!
//! The wire format is the CouchDB `_all_docs` listing:
//!
//! ```json
//! {"total_rows": 2, "offset": 0, "rows": [
//!   {"id": "left-pad", "key": "left-pad", "value": {"rev": "12-abc"}}
//! ]}
//! ```

use serde::{Deserialize, Serialize};

/// A single row of the registry index.
///
/// `id` is the package name the generated manifests depend on; `key` and
/// `revision` are carried along verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "WireRow", into = "WireRow")]
pub struct RegistryEntry {
    pub id: String,
    pub key: String,
    pub revision: String,
}

impl RegistryEntry {
    pub fn new(id: impl Into<String>, key: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            revision: revision.into(),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
struct WireRow {
    id: String,
    key: String,
    value: WireValue,
}

#[derive(Clone, Deserialize, Serialize)]
struct WireValue {
    rev: String,
}

impl From<WireRow> for RegistryEntry {
    fn from(row: WireRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            revision: row.value.rev,
        }
    }
}

impl From<RegistryEntry> for WireRow {
    fn from(entry: RegistryEntry) -> Self {
        Self {
            id: entry.id,
            key: entry.key,
            value: WireValue {
                rev: entry.revision,
            },
        }
    }
}

/// The full ordered listing returned by one index request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    pub total_rows: u64,
    pub offset: u64,
    #[serde(rename = "rows")]
    pub entries: Vec<RegistryEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the snapshot, keeping only the ordered entries.
    pub fn into_entries(self) -> Vec<RegistryEntry> {
        self.entries
    }
}
