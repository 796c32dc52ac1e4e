use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::documents::DocumentTable;

/// Semantic role of the column steps should treat as "the" document text.
pub const TEXT_ROLE: &str = "text";

/// State handed from one pipeline step to the next.
#[derive(Debug, Clone, Default)]
pub struct PipelineIntermediate {
    pub query: String,
    pub arguments: Map<String, Value>,
    pub documents: DocumentTable,
    /// Run-level statistics, independent of `documents`.
    pub metadata: DocumentTable,
    column_types: IndexMap<String, String>,
    history: BTreeMap<usize, DocumentTable>,
}

impl PipelineIntermediate {
    pub fn new(query: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            query: query.into(),
            arguments,
            ..Self::default()
        }
    }

    pub fn with_documents(mut self, documents: DocumentTable) -> Self {
        self.documents = documents;
        self
    }

    /// Records or overwrites the semantic role of `column`.
    ///
    /// A re-assigned column moves to the end so the latest assignment wins in
    /// role lookups.
    pub fn set_column_type(&mut self, column: &str, role: &str) {
        self.column_types.shift_remove(column);
        self.column_types
            .insert(column.to_string(), role.to_string());
    }

    pub fn set_text_column(&mut self, column: &str) {
        self.set_column_type(column, TEXT_ROLE);
    }

    pub fn column_type(&self, column: &str) -> Option<&str> {
        self.column_types.get(column).map(String::as_str)
    }

    pub fn column_types(&self) -> &IndexMap<String, String> {
        &self.column_types
    }

    /// Most recently assigned column carrying `role`.
    pub fn column_with_type(&self, role: &str) -> Option<&str> {
        self.column_types
            .iter()
            .rev()
            .find(|(_, r)| r.as_str() == role)
            .map(|(column, _)| column.as_str())
    }

    pub fn text_column(&self) -> Option<&str> {
        self.column_with_type(TEXT_ROLE)
    }

    /// Appends a copy of the current documents under the next step index and
    /// returns that index. Indices start at 1.
    pub fn record_history(&mut self) -> usize {
        let key = self.history.len() + 1;
        self.history.insert(key, self.documents.clone());
        key
    }

    pub fn history(&self) -> &BTreeMap<usize, DocumentTable> {
        &self.history
    }

    pub fn history_entry(&self, step: usize) -> Option<&DocumentTable> {
        self.history.get(&step)
    }
}
