//! Response definitions
//!
//! Represents decoded server replies.

use indexmap::IndexMap;

/// One row of a reply: column name to value, in reply order
pub type Record = IndexMap<String, String>;

/// A decoded reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Whether the server reported success
    pub success: bool,

    /// Human-readable detail, empty when the reply carried none
    pub detail: String,

    /// Rows returned, in reply order
    pub data: Vec<Record>,
}

impl Response {
    /// Create a successful response
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
            data: Vec::new(),
        }
    }

    /// Create a failed response
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
            data: Vec::new(),
        }
    }

    /// Append a row built from `(column, value)` pairs
    pub fn with_record<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let record = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.data.push(record);
        self
    }
}
