//! Task progress broadcaster for streaming lifecycle events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::ProgressConfig;

/// Lifecycle point a progress event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Started,
    StepStarted,
    StepFinished,
    Completed,
    Cancelled,
    Failed,
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPhase::Started => write!(f, "Started"),
            TaskPhase::StepStarted => write!(f, "Step started"),
            TaskPhase::StepFinished => write!(f, "Step finished"),
            TaskPhase::Completed => write!(f, "Completed"),
            TaskPhase::Cancelled => write!(f, "Cancelled"),
            TaskPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress event for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgressEvent {
    pub task_id: String,
    pub phase: TaskPhase,
    /// Name of the step the event refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Steps completed so far.
    pub completed_steps: usize,
    pub total_steps: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskProgressEvent {
    pub fn new(task_id: &str, phase: TaskPhase, completed_steps: usize, total_steps: usize) -> Self {
        Self {
            task_id: task_id.to_string(),
            phase,
            step: None,
            completed_steps,
            total_steps,
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Broadcasts task progress events to any number of subscribers.
#[derive(Clone)]
pub struct TaskProgressBroadcaster {
    sender: Arc<broadcast::Sender<TaskProgressEvent>>,
}

impl TaskProgressBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    pub fn send(&self, event: TaskProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker bound to one task.
    pub fn track(&self, task_id: &str, total_steps: usize) -> TaskProgressTracker {
        TaskProgressTracker {
            task_id: task_id.to_string(),
            total_steps,
            sender: Some(Arc::clone(&self.sender)),
        }
    }
}

impl Default for TaskProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits events for a single task. A detached tracker drops everything.
pub struct TaskProgressTracker {
    task_id: String,
    total_steps: usize,
    sender: Option<Arc<broadcast::Sender<TaskProgressEvent>>>,
}

impl TaskProgressTracker {
    /// Tracker with no broadcaster behind it.
    pub fn detached(task_id: &str, total_steps: usize) -> Self {
        Self {
            task_id: task_id.to_string(),
            total_steps,
            sender: None,
        }
    }

    fn emit(&self, phase: TaskPhase, completed: usize, step: Option<&str>, error: Option<&str>) {
        let Some(sender) = &self.sender else {
            return;
        };
        let mut event = TaskProgressEvent::new(&self.task_id, phase, completed, self.total_steps);
        event.step = step.map(str::to_string);
        event.error = error.map(str::to_string);
        let _ = sender.send(event);
    }

    pub fn started(&self) {
        self.emit(TaskPhase::Started, 0, None, None);
    }

    pub fn step_started(&self, completed: usize, step: &str) {
        self.emit(TaskPhase::StepStarted, completed, Some(step), None);
    }

    pub fn step_finished(&self, completed: usize, step: &str) {
        self.emit(TaskPhase::StepFinished, completed, Some(step), None);
    }

    pub fn completed(&self) {
        self.emit(TaskPhase::Completed, self.total_steps, None, None);
    }

    pub fn cancelled(&self, completed: usize) {
        self.emit(TaskPhase::Cancelled, completed, None, None);
    }

    pub fn failed(&self, completed: usize, error: &str) {
        self.emit(TaskPhase::Failed, completed, None, Some(error));
    }
}
