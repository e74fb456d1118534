//! Raw, untyped input rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single source row exactly as read, before any validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    /// 1-based data row number in the source file (header excluded)
    pub row: usize,
    /// Column name to cell text
    pub values: BTreeMap<String, String>,
    /// Columns whose bytes were not valid UTF-8; their text is a lossy decode
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub undecodable: BTreeSet<String>,
}

impl RawRecord {
    /// Create a raw record from column/value pairs.
    pub fn new<I, K, V>(row: usize, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            row,
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            undecodable: BTreeSet::new(),
        }
    }

    /// Whether the cell's source bytes failed to decode.
    pub fn is_undecodable(&self, field: &str) -> bool {
        self.undecodable.contains(field)
    }

    /// Trimmed cell text; blank cells and absent columns are both `None`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
