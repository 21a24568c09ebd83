//! Cell addressing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one cell: a table, a BLOB column, and a row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub table: String,
    pub column: String,
    pub row_id: i64,
}

impl Locator {
    pub fn new(table: impl Into<String>, column: impl Into<String>, row_id: i64) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            row_id,
        }
    }

    /// Same table and column, different row
    pub fn with_row(&self, row_id: i64) -> Self {
        Self {
            table: self.table.clone(),
            column: self.column.clone(),
            row_id,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.table, self.column, self.row_id)
    }
}
