use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::handler::{LogEntry, StepProgress};
use crate::table::{PipelineIntermediate, Record};

/// Lifecycle state of a task.
///
/// `Created` -> `Running` -> one of `Completed`, `Cancelled` or `Failed`. The
/// last three are terminal. A task that is cancelled before it starts goes
/// straight from `Created` to `Cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Created,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Created => write!(f, "created"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Cancelled => write!(f, "cancelled"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable run state shared between the worker and status readers.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub state: TaskState,
    pub current_step: String,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub error: Option<String>,
    /// Final table, or the partial one of a cancelled run.
    pub result: Option<PipelineIntermediate>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn pipeline_percentage(&self) -> f64 {
        if self.state == TaskState::Completed {
            return 1.0;
        }
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

/// Immutable snapshot of a task, as returned by `PipelineTask::status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    pub current_step: String,
    /// `"completedSteps/totalSteps"`.
    pub pipeline_progress: String,
    pub pipeline_percentage: f64,
    /// `"current/total"` of the active step.
    pub step_progress: String,
    pub step_percentage: f64,
    pub log: Vec<LogEntry>,
    pub error: Option<String>,
    pub result: Option<Vec<Record>>,
    pub metadata: Option<Vec<Record>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskStatus {
    pub(crate) fn capture(
        task_id: &str,
        run: &RunState,
        step: StepProgress,
        log: Vec<LogEntry>,
    ) -> Self {
        let step_percentage = if run.state == TaskState::Completed {
            1.0
        } else {
            step.percentage()
        };

        Self {
            task_id: task_id.to_string(),
            state: run.state,
            current_step: run.current_step.clone(),
            pipeline_progress: format!("{}/{}", run.completed_steps, run.total_steps),
            pipeline_percentage: run.pipeline_percentage(),
            step_progress: step.to_string(),
            step_percentage,
            log,
            error: run.error.clone(),
            result: run.result.as_ref().map(|r| r.documents.to_records()),
            metadata: run.result.as_ref().map(|r| r.metadata.to_records()),
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}
