use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StepError;

/// One row in record orientation: column name to cell value.
pub type Record = Map<String, Value>;

/// Column-oriented table of documents.
///
/// Every column holds exactly `len()` cells; cells absent from an input record
/// are stored as `null`. Cloning copies every cell, so a clone never observes
/// later writes to the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDocumentTable")]
pub struct DocumentTable {
    columns: IndexMap<String, Vec<Value>>,
    rows: usize,
}

#[derive(Deserialize)]
struct RawDocumentTable {
    columns: IndexMap<String, Vec<Value>>,
    rows: usize,
}

impl TryFrom<RawDocumentTable> for DocumentTable {
    type Error = String;

    fn try_from(raw: RawDocumentTable) -> Result<Self, Self::Error> {
        if let Some((name, cells)) = raw.columns.iter().find(|(_, cells)| cells.len() != raw.rows) {
            return Err(format!(
                "column '{}' has {} values but the table has {} rows",
                name,
                cells.len(),
                raw.rows
            ));
        }
        Ok(Self {
            columns: raw.columns,
            rows: raw.rows,
        })
    }
}

impl DocumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from row records. Columns appear in first-seen order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let rows = records.len();
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();

        for (index, record) in records.into_iter().enumerate() {
            for (name, value) in record {
                let column = columns
                    .entry(name)
                    .or_insert_with(|| vec![Value::Null; rows]);
                column[index] = value;
            }
        }

        Self { columns, rows }
    }

    /// Exports the table as row records, one map per row.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.rows)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|(name, cells)| (name.clone(), cells[row].clone()))
                    .collect()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Returns a column as strings, with `null` cells read as `""`.
    pub fn column_strings(&self, name: &str) -> Option<Vec<String>> {
        self.columns
            .get(name)
            .map(|cells| cells.iter().map(stringify_cell).collect())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.columns.get(column).and_then(|cells| cells.get(row))
    }

    /// Adds or replaces a column.
    ///
    /// The first column written to an empty table defines its row count; after
    /// that every column must match it.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), StepError> {
        if self.columns.is_empty() && self.rows == 0 {
            self.rows = values.len();
        }

        if values.len() != self.rows {
            return Err(StepError::ColumnLength {
                column: name.to_string(),
                expected: self.rows,
                found: values.len(),
            });
        }

        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Value>> {
        self.columns.shift_remove(name)
    }

    /// Appends a row. New columns are back-filled with `null`.
    pub fn push_row(&mut self, record: Record) {
        let rows = self.rows;
        for (name, value) in record {
            self.columns
                .entry(name)
                .or_insert_with(|| vec![Value::Null; rows])
                .push(value);
        }
        self.rows += 1;
        for cells in self.columns.values_mut() {
            if cells.len() < self.rows {
                cells.push(Value::Null);
            }
        }
    }

    /// Keeps only the first `rows` rows.
    pub fn truncate(&mut self, rows: usize) {
        if rows >= self.rows {
            return;
        }
        for cells in self.columns.values_mut() {
            cells.truncate(rows);
        }
        self.rows = rows;
    }
}

/// Text form of a cell: strings verbatim, `null` as `""`, anything else as JSON.
pub fn stringify_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
