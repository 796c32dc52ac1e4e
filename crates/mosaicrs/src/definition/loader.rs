use serde::Deserialize;
use serde_json::{Map, Value};

use super::schema::{PipelineDefinition, StepEntry};
use crate::error::DefinitionError;

const SCHEMA_JSON: &str = include_str!("../../schema/pipeline-v1.json");

const QUERY_KEY: &str = "query";
const ARGUMENTS_KEY: &str = "parameters";
const WRAPPER_KEY: &str = "pipeline";

#[derive(Deserialize)]
struct RawStep {
    id: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

/// Parses a pipeline submission from JSON text.
pub fn parse_definition(content: &str) -> Result<PipelineDefinition, DefinitionError> {
    let value: Value = serde_json::from_str(content)?;
    parse_definition_value(value)
}

/// Parses a pipeline submission.
///
/// `query` and `parameters` are taken out first; every remaining key must be
/// an integer and names one step. Steps are ordered by the numeric value of
/// their key, so `"10"` runs after `"2"`. A submission wrapped as
/// `{"pipeline": {...}}` is unwrapped.
pub fn parse_definition_value(value: Value) -> Result<PipelineDefinition, DefinitionError> {
    let value = unwrap_pipeline(value);

    validate_schema(&value)?;

    let Value::Object(mut map) = value else {
        return Err(DefinitionError::Validation {
            message: "pipeline definition must be an object".to_string(),
        });
    };

    let query = match map.remove(QUERY_KEY) {
        Some(Value::String(query)) => query,
        _ => String::new(),
    };
    let arguments = match map.remove(ARGUMENTS_KEY) {
        Some(Value::Object(arguments)) => arguments,
        _ => Map::new(),
    };

    let mut steps = Vec::with_capacity(map.len());
    for (key, value) in map {
        let index = key
            .trim()
            .parse::<i64>()
            .map_err(|_| DefinitionError::InvalidStepKey { key: key.clone() })?;
        let raw: RawStep = serde_json::from_value(value)?;
        steps.push(StepEntry {
            key,
            index,
            id: raw.id,
            parameters: raw.parameters,
        });
    }

    steps.sort_by_key(|step| step.index);

    if let Some(pair) = steps.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(DefinitionError::DuplicateStepIndex {
            first: pair[0].key.clone(),
            second: pair[1].key.clone(),
        });
    }

    Ok(PipelineDefinition {
        query,
        arguments,
        steps,
    })
}

fn unwrap_pipeline(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.get(WRAPPER_KEY).is_some_and(Value::is_object) => {
            map.remove(WRAPPER_KEY).unwrap_or_default()
        }
        other => other,
    }
}

fn validate_schema(value: &Value) -> Result<(), DefinitionError> {
    let schema: Value = serde_json::from_str(SCHEMA_JSON).map_err(|e| DefinitionError::Validation {
        message: format!("Invalid embedded schema JSON: {}", e),
    })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| DefinitionError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        return Err(DefinitionError::SchemaValidation {
            errors: errors.join("; "),
        });
    }

    Ok(())
}
