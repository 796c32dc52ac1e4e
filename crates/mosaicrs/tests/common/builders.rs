//! Builders for creating test documents and pipeline definitions.

#![allow(dead_code)]

use serde_json::{json, Map, Value};

use mosaicrs::{DocumentTable, PipelineDefinition, Record};

/// Builder for the documents table a task starts with.
#[derive(Default)]
pub struct DocumentsBuilder {
    records: Vec<Record>,
}

impl DocumentsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with a `full-text` and `language` column.
    pub fn document(mut self, text: &str, language: &str) -> Self {
        self.records
            .push(record(json!({"full-text": text, "language": language})));
        self
    }

    /// Add `count` English documents with distinct texts.
    pub fn numbered(mut self, count: usize) -> Self {
        for i in 0..count {
            self = self.document(&format!("document number {}", i), "eng");
        }
        self
    }

    pub fn build(self) -> DocumentTable {
        DocumentTable::from_records(self.records)
    }
}

/// Builder for `PipelineDefinition` with explicit step keys.
pub struct DefinitionBuilder {
    query: String,
    steps: Map<String, Value>,
}

impl DefinitionBuilder {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            steps: Map::new(),
        }
    }

    /// Add a step under the given key.
    pub fn step(mut self, key: &str, id: &str, parameters: Value) -> Self {
        self.steps
            .insert(key.to_string(), json!({"id": id, "parameters": parameters}));
        self
    }

    /// The submission as JSON text.
    pub fn to_json(&self) -> String {
        let mut root = self.steps.clone();
        root.insert("query".to_string(), Value::from(self.query.clone()));
        Value::Object(root).to_string()
    }

    pub fn build(self) -> PipelineDefinition {
        mosaicrs::parse_definition(&self.to_json()).expect("Test definition should parse")
    }
}

pub fn record(value: Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("Test record should be a JSON object")
}
