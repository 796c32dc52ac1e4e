use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to parse pipeline JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Pipeline schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Pipeline definition is invalid: {message}")]
    Validation { message: String },

    #[error("Step key '{key}' is not an integer index")]
    InvalidStepKey { key: String },

    #[error("Step keys '{first}' and '{second}' resolve to the same index")]
    DuplicateStepIndex { first: String, second: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Missing required parameter '{name}'")]
    Missing { name: String },

    #[error("Parameter '{name}' must be {expected}, got {found}")]
    WrongKind {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Parameter '{name}' has value '{value}', expected one of: {allowed}")]
    NotAllowed {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("Unknown parameter '{name}'")]
    Unknown { name: String },
}

impl ParameterError {
    /// Name of the offending parameter.
    pub fn parameter(&self) -> &str {
        match self {
            ParameterError::Missing { name }
            | ParameterError::WrongKind { name, .. }
            | ParameterError::NotAllowed { name, .. }
            | ParameterError::Unknown { name } => name,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Unknown step id '{0}'")]
    UnknownStep(String),

    #[error("Invalid parameters for step '{step}': {source}")]
    InvalidParameters {
        step: String,
        #[source]
        source: ParameterError,
    },

    #[error("Step '{step}' failed on row {row}: {reason}")]
    RowFailed {
        step: String,
        row: usize,
        reason: String,
    },

    #[error("Column '{column}' has {found} values but the table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Step '{step}' failed: {reason}")]
    Failed { step: String, reason: String },
}

/// Failure of a single row transform; the row processor adds step and row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RowError(pub String);

impl RowError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task {0} has already been started")]
    AlreadyStarted(String),

    #[error("Failed to spawn worker for task {id}: {source}")]
    SpawnFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker for task {0} panicked")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
