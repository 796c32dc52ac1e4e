//! The step contract, the row-processing routine and the built-in steps.

pub mod document_statistics;
pub mod language;
pub mod params;
pub mod registry;
pub mod row_processor;
pub mod stemmer;
pub mod text_cleaner;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::StepError;
use crate::handler::StepHandler;
use crate::table::PipelineIntermediate;

pub use document_statistics::DocumentStatistics;
pub use params::StepParameters;
pub use registry::StepRegistry;
pub use row_processor::{process_rows, RowInput, RowJob, RowOutcome, RowOutput};
pub use stemmer::TextStemmer;
pub use text_cleaner::TextCleaner;

/// A unit of work in a pipeline.
///
/// Steps take ownership of the intermediate table and hand back the
/// transformed one. They report progress, consult cancellation and share
/// cached results through the task's handler.
pub trait Step: Send {
    /// Human-readable name shown as the task's current step.
    fn name(&self) -> &str;

    fn transform(
        &self,
        data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError>;
}

/// Catalog entry describing a step and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    pub parameters: IndexMap<String, ParameterSpec>,
}

impl StepInfo {
    pub fn new(name: &str, category: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            parameters: IndexMap::new(),
        }
    }

    pub fn parameter(mut self, name: &str, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.to_string(), spec);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Free text.
    Text,
    /// Single choice, optionally limited to `allowedValues`.
    Dropdown,
    Boolean,
}

impl ParameterKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterKind::Text | ParameterKind::Dropdown => value.is_string(),
            ParameterKind::Boolean => value.is_boolean(),
        }
    }

    pub fn expected(&self) -> &'static str {
        match self {
            ParameterKind::Text | ParameterKind::Dropdown => "a string",
            ParameterKind::Boolean => "a boolean",
        }
    }
}

/// Declarative description of one step parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub title: String,
    pub description: String,
    pub kind: ParameterKind,
    /// When set, values outside `allowed_values` are rejected.
    pub enforce_limit: bool,
    pub required: bool,
    pub allowed_values: Vec<String>,
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(kind: ParameterKind, title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            kind,
            enforce_limit: false,
            required: false,
            allowed_values: Vec::new(),
            default: None,
        }
    }

    pub fn text(title: &str, description: &str) -> Self {
        Self::new(ParameterKind::Text, title, description)
    }

    pub fn dropdown(title: &str, description: &str, allowed: &[&str]) -> Self {
        let mut spec = Self::new(ParameterKind::Dropdown, title, description);
        spec.allowed_values = allowed.iter().map(|v| v.to_string()).collect();
        spec
    }

    pub fn boolean(title: &str, description: &str) -> Self {
        Self::new(ParameterKind::Boolean, title, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn enforce_limit(mut self) -> Self {
        self.enforce_limit = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}
