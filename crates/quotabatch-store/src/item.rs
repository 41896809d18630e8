use rusqlite::types::Value;
use rusqlite::Row;
use std::collections::BTreeMap;

/// One claimed row from the job table.
///
/// The core never knows the table's column set beyond `id`; every other
/// column is whatever the Strategy's schema declared, read back generically
/// via `SELECT *` and handed to the Strategy to interpret.
#[derive(Debug, Clone)]
pub struct JobItem {
    pub id: i64,
    columns: BTreeMap<String, Value>,
}

impl JobItem {
    /// Builds a [`JobItem`] from a `SELECT *` row. Public so a
    /// [`crate::Store::query_rows`] caller outside this crate (a job
    /// strategy's bulk `prepare()` read) can reuse it directly.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut columns = BTreeMap::new();
        for index in 0..row.as_ref().column_count() {
            let name = row.as_ref().column_name(index)?.to_string();
            let value: Value = row.get(index)?;
            columns.insert(name, value);
        }
        let id = match columns.get("id") {
            Some(Value::Integer(id)) => *id,
            _ => {
                return Err(rusqlite::Error::InvalidColumnName(
                    "expected an integer id column".to_string(),
                ))
            }
        };
        Ok(Self { id, columns })
    }

    /// Returns the raw SQLite value stored in `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Returns `column` as a string, if present and of text type.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns `column` as an integer, if present and of integer type.
    pub fn get_int(&self, column: &str) -> Option<i64> {
        match self.get(column) {
            Some(Value::Integer(value)) => Some(*value),
            _ => None,
        }
    }
}
