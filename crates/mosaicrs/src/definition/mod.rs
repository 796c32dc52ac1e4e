//! Declarative pipeline definitions as submitted by callers.

pub mod loader;
pub mod schema;

pub use loader::{parse_definition, parse_definition_value};
pub use schema::{PipelineDefinition, StepEntry};
