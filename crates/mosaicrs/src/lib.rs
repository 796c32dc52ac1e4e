pub mod broadcast;
pub mod config;
pub mod definition;
pub mod error;
pub mod handler;
pub mod steps;
pub mod table;
pub mod task;
pub mod telemetry;

pub use broadcast::{TaskPhase, TaskProgressBroadcaster, TaskProgressEvent};
pub use config::{load_config, EngineConfig};
pub use definition::{parse_definition, PipelineDefinition, StepEntry};
pub use error::{
    ConfigError, DefinitionError, MosaicError, ParameterError, Result, RowError, StepError,
    TaskError,
};
pub use handler::{InMemoryCache, LogEntry, ResultCache, StepHandler, StepProgress};
pub use steps::{ParameterKind, ParameterSpec, Step, StepInfo, StepParameters, StepRegistry};
pub use table::{DocumentTable, PipelineIntermediate, Record};
pub use task::{PipelineTask, TaskState, TaskStatus};
pub use telemetry::init_tracing;
