//! Broadcasting of task progress for real-time consumers.

pub mod task_progress;

pub use task_progress::{
    TaskPhase, TaskProgressBroadcaster, TaskProgressEvent, TaskProgressTracker,
};
