use serde::Serialize;
use serde_json::{Map, Value};

/// One step of a submitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepEntry {
    /// Key as submitted, e.g. `"10"`.
    pub key: String,
    /// Numeric value of `key`; steps run in ascending order of it.
    pub index: i64,
    pub id: String,
    pub parameters: Map<String, Value>,
}

/// A parsed pipeline: the run's query and arguments plus its ordered steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineDefinition {
    pub query: String,
    pub arguments: Map<String, Value>,
    /// Sorted by `index`.
    pub steps: Vec<StepEntry>,
}

impl PipelineDefinition {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Appends a step after the current last one.
    pub fn with_step(mut self, id: &str, parameters: Map<String, Value>) -> Self {
        let index = self.steps.last().map(|s| s.index + 1).unwrap_or(1);
        self.steps.push(StepEntry {
            key: index.to_string(),
            index,
            id: id.to_string(),
            parameters,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
