//! One pipeline run: definition in, status snapshots out.

pub mod pipeline_task;
mod runner;
pub mod status;

pub use pipeline_task::PipelineTask;
pub use status::{TaskState, TaskStatus};
