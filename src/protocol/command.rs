//! Command definitions
//!
//! Represents commands sent to the server.

use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, Result};

/// Column types understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Int,
    Text,
    Double,
    Date,
}

impl ColumnKind {
    /// Every supported kind, in wire order
    pub const ALL: [ColumnKind; 4] = [
        ColumnKind::Int,
        ColumnKind::Text,
        ColumnKind::Double,
        ColumnKind::Date,
    ];

    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Int => "INT",
            ColumnKind::Text => "TEXT",
            ColumnKind::Double => "DOUBLE",
            ColumnKind::Date => "DATE",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the exact wire spelling; anything else is `InvalidKind`
impl FromStr for ColumnKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        ColumnKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ClientError::InvalidKind(s.to_string()))
    }
}

/// A `(column, value, kind)` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    pub column: String,
    pub value: String,
    pub kind: ColumnKind,
}

impl TypedValue {
    pub fn new(column: impl Into<String>, value: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            kind,
        }
    }

    /// Build from a kind given as text, failing on unsupported kinds
    pub fn parse(column: &str, value: &str, kind: &str) -> Result<Self> {
        Ok(Self::new(column, value, kind.parse()?))
    }
}

/// A column declaration for `create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub column: String,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn new(column: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }
}

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Query,
    Cmd,
    Get,
    Create,
    Insert,
    Update,
    Delete,
}

impl CommandType {
    /// Verb as written on the wire. `query` and `cmd` never reach the wire;
    /// their text is forwarded verbatim.
    pub fn verb(&self) -> &'static str {
        match self {
            CommandType::Query => "query",
            CommandType::Cmd => "cmd",
            CommandType::Get => "get",
            CommandType::Create => "create",
            CommandType::Insert => "insert",
            CommandType::Update => "update",
            CommandType::Delete => "delete",
        }
    }
}

/// A command ready to be encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw query text, forwarded verbatim
    Query(String),

    /// Raw command text, forwarded verbatim
    Cmd(String),

    /// Fetch one row by key
    Get { table: String, key: i64 },

    /// Declare a table; `key_column` indexes into `columns`
    Create {
        table: String,
        key_column: usize,
        columns: Vec<ColumnDef>,
    },

    /// Insert one row
    Insert {
        table: String,
        values: Vec<TypedValue>,
    },

    /// Update the row with `key`
    Update {
        table: String,
        key: i64,
        values: Vec<TypedValue>,
    },

    /// Delete the row with `key`
    Delete { table: String, key: i64 },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Query(_) => CommandType::Query,
            Command::Cmd(_) => CommandType::Cmd,
            Command::Get { .. } => CommandType::Get,
            Command::Create { .. } => CommandType::Create,
            Command::Insert { .. } => CommandType::Insert,
            Command::Update { .. } => CommandType::Update,
            Command::Delete { .. } => CommandType::Delete,
        }
    }

    pub fn get(table: impl Into<String>, key: i64) -> Self {
        Command::Get {
            table: table.into(),
            key,
        }
    }

    pub fn delete(table: impl Into<String>, key: i64) -> Self {
        Command::Delete {
            table: table.into(),
            key,
        }
    }

    /// `create` from `(column, kind)` pairs
    pub fn create(table: impl Into<String>, key_column: usize, columns: &[(&str, &str)]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|(column, kind)| -> Result<ColumnDef> { Ok(ColumnDef::new(*column, kind.parse()?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Command::Create {
            table: table.into(),
            key_column,
            columns,
        })
    }

    /// `insert` from `(column, value, kind)` triples
    pub fn insert(table: impl Into<String>, values: &[(&str, &str, &str)]) -> Result<Self> {
        Ok(Command::Insert {
            table: table.into(),
            values: typed_values(values)?,
        })
    }

    /// `update` from `(column, value, kind)` triples
    pub fn update(table: impl Into<String>, key: i64, values: &[(&str, &str, &str)]) -> Result<Self> {
        Ok(Command::Update {
            table: table.into(),
            key,
            values: typed_values(values)?,
        })
    }
}

fn typed_values(values: &[(&str, &str, &str)]) -> Result<Vec<TypedValue>> {
    values
        .iter()
        .map(|(column, value, kind)| TypedValue::parse(column, value, kind))
        .collect()
}
