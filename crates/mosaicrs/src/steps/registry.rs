use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{document_statistics, stemmer, text_cleaner};
use super::{DocumentStatistics, Step, StepInfo, StepParameters, TextCleaner, TextStemmer};
use crate::error::{ParameterError, StepError};

type Constructor =
    Box<dyn Fn(&StepParameters) -> Result<Box<dyn Step>, ParameterError> + Send + Sync>;

struct RegisteredStep {
    info: StepInfo,
    construct: Constructor,
}

/// Maps stable step identifiers to their schema and constructor.
pub struct StepRegistry {
    steps: IndexMap<String, RegisteredStep>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            steps: IndexMap::new(),
        }
    }

    /// Registry holding every step that ships with the crate.
    pub fn with_builtin_steps() -> Self {
        let mut registry = Self::new();
        registry.register(stemmer::STEP_ID, TextStemmer::info(), |params| {
            Ok(Box::new(TextStemmer::from_parameters(params)?))
        });
        registry.register(text_cleaner::STEP_ID, TextCleaner::info(), |params| {
            Ok(Box::new(TextCleaner::from_parameters(params)?))
        });
        registry.register(
            document_statistics::STEP_ID,
            DocumentStatistics::info(),
            |params| Ok(Box::new(DocumentStatistics::from_parameters(params)?)),
        );
        registry
    }

    /// Adds or replaces the step registered under `id`.
    pub fn register<F>(&mut self, id: &str, info: StepInfo, construct: F)
    where
        F: Fn(&StepParameters) -> Result<Box<dyn Step>, ParameterError> + Send + Sync + 'static,
    {
        self.steps.insert(
            id.to_string(),
            RegisteredStep {
                info,
                construct: Box::new(construct),
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn info(&self, id: &str) -> Option<&StepInfo> {
        self.steps.get(id).map(|s| &s.info)
    }

    /// Validates `parameters` against the step's schema and builds the step.
    pub fn create(
        &self,
        id: &str,
        parameters: &Map<String, Value>,
    ) -> Result<Box<dyn Step>, StepError> {
        let registered = self
            .steps
            .get(id)
            .ok_or_else(|| StepError::UnknownStep(id.to_string()))?;

        let invalid = |source| StepError::InvalidParameters {
            step: id.to_string(),
            source,
        };

        let params = StepParameters::bind(&registered.info.parameters, parameters).map_err(invalid)?;
        (registered.construct)(&params).map_err(invalid)
    }

    /// Every registered step, keyed by id, in registration order.
    pub fn catalog(&self) -> IndexMap<String, StepInfo> {
        self.steps
            .iter()
            .map(|(id, s)| (id.clone(), s.info.clone()))
            .collect()
    }

    pub fn catalog_json(&self) -> Value {
        serde_json::to_value(self.catalog()).unwrap_or(Value::Null)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::with_builtin_steps()
    }
}
