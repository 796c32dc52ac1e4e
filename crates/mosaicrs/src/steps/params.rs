use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{ParameterKind, ParameterSpec};
use crate::error::ParameterError;

/// Parameters checked against a step's schema, with defaults applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepParameters {
    values: Map<String, Value>,
}

impl StepParameters {
    /// Validates `raw` against `specs`.
    ///
    /// Unknown names are rejected, `null` counts as absent, and absent
    /// parameters fall back to their default. Values of an `enforce_limit`
    /// dropdown must be one of its allowed values.
    pub fn bind(
        specs: &IndexMap<String, ParameterSpec>,
        raw: &Map<String, Value>,
    ) -> Result<Self, ParameterError> {
        if let Some(name) = raw.keys().find(|name| !specs.contains_key(*name)) {
            return Err(ParameterError::Unknown { name: name.clone() });
        }

        let mut values = Map::new();
        for (name, spec) in specs {
            let value = match raw.get(name).filter(|v| !v.is_null()) {
                Some(value) => value.clone(),
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None if spec.required => {
                        return Err(ParameterError::Missing { name: name.clone() })
                    }
                    None => continue,
                },
            };

            check_value(name, spec, &value)?;
            values.insert(name.clone(), value);
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String parameter that must be present after defaults.
    pub fn text(&self, name: &str) -> Result<&str, ParameterError> {
        self.optional_text(name)
            .ok_or_else(|| ParameterError::Missing {
                name: name.to_string(),
            })
    }

    pub fn optional_text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParameterError> {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ParameterError::Missing {
                name: name.to_string(),
            })
    }
}

fn check_value(name: &str, spec: &ParameterSpec, value: &Value) -> Result<(), ParameterError> {
    if !spec.kind.accepts(value) {
        return Err(ParameterError::WrongKind {
            name: name.to_string(),
            expected: spec.kind.expected().to_string(),
            found: kind_of(value).to_string(),
        });
    }

    if spec.kind == ParameterKind::Dropdown && spec.enforce_limit {
        let text = value.as_str().unwrap_or_default();
        if !spec.allowed_values.iter().any(|allowed| allowed == text) {
            return Err(ParameterError::NotAllowed {
                name: name.to_string(),
                value: text.to_string(),
                allowed: spec.allowed_values.join(", "),
            });
        }
    }

    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
