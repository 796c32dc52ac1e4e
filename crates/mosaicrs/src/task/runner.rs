use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use super::status::{RunState, TaskState};
use crate::broadcast::TaskProgressTracker;
use crate::definition::PipelineDefinition;
use crate::error::StepError;
use crate::handler::StepHandler;
use crate::steps::{Step, StepRegistry};
use crate::table::{DocumentTable, PipelineIntermediate};

/// State shared by a task, its worker and status readers.
pub(crate) struct TaskShared {
    pub id: String,
    pub handler: StepHandler,
    pub run: RwLock<RunState>,
}

impl TaskShared {
    pub fn new(id: String, total_steps: usize) -> Self {
        Self {
            id,
            handler: StepHandler::new(),
            run: RwLock::new(RunState {
                total_steps,
                ..RunState::default()
            }),
        }
    }

    pub fn update<F: FnOnce(&mut RunState)>(&self, f: F) {
        match self.run.write() {
            Ok(mut run) => f(&mut run),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn state(&self) -> TaskState {
        match self.run.read() {
            Ok(run) => run.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }
}

/// Everything the worker needs, moved into its thread.
pub(crate) struct RunInput {
    pub definition: PipelineDefinition,
    pub documents: DocumentTable,
    pub registry: Arc<StepRegistry>,
    pub tracker: TaskProgressTracker,
}

/// Worker body: resolves every step, then runs them in order.
pub(crate) fn run_pipeline(shared: &TaskShared, input: RunInput) {
    let RunInput {
        definition,
        documents,
        registry,
        tracker,
    } = input;

    let _pipeline_span = info_span!("pipeline",
        task_id = %shared.id,
        steps = definition.len(),
    )
    .entered();

    info!(query = %definition.query, "running pipeline");
    tracker.started();

    // Resolve the whole pipeline before touching data, so an unknown id or bad
    // parameters at step N never leaves steps 1..N-1 half applied.
    let steps = match resolve_steps(&registry, &definition) {
        Ok(steps) => steps,
        Err(e) => {
            fail(shared, &tracker, 0, e);
            return;
        }
    };

    let total = steps.len();
    let mut data =
        PipelineIntermediate::new(definition.query, definition.arguments).with_documents(documents);

    for (position, step) in steps.iter().enumerate() {
        if shared.handler.should_cancel() {
            cancel(shared, &tracker, position, data);
            return;
        }

        let name = step.name().to_string();
        // Under the run lock so no snapshot pairs this step's name with the
        // previous step's progress.
        shared.update(|run| {
            run.current_step = name.clone();
            run.completed_steps = position;
            shared.handler.reset();
        });
        tracker.step_started(position, &name);

        let _step_span = info_span!("step", index = position + 1, name = %name).entered();
        debug!("step started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| step.transform(data, &shared.handler)));
        data = match outcome {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                fail(shared, &tracker, position, e);
                return;
            }
            Err(_) => {
                let e = StepError::Failed {
                    step: name,
                    reason: "step panicked".to_string(),
                };
                fail(shared, &tracker, position, e);
                return;
            }
        };

        // A step that observed cancellation may have stopped early; it does
        // not count as completed.
        if shared.handler.should_cancel() {
            cancel(shared, &tracker, position, data);
            return;
        }

        let stats = shared.handler.cache_stats();
        debug!(
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            cache_entries = stats.entries,
            "step finished"
        );

        shared.update(|run| run.completed_steps = position + 1);
        tracker.step_finished(position + 1, &name);
    }

    info!(steps = total, "pipeline completed");
    shared.update(|run| {
        run.state = TaskState::Completed;
        run.completed_steps = total;
        run.result = Some(data);
        run.finished_at = Some(Utc::now());
    });
    tracker.completed();
}

fn resolve_steps(
    registry: &StepRegistry,
    definition: &PipelineDefinition,
) -> Result<Vec<Box<dyn Step>>, StepError> {
    definition
        .steps
        .iter()
        .map(|entry| {
            debug!(key = %entry.key, id = %entry.id, "resolving step");
            registry.create(&entry.id, &entry.parameters)
        })
        .collect()
}

fn fail(shared: &TaskShared, tracker: &TaskProgressTracker, completed: usize, e: StepError) {
    let message = e.to_string();
    error!("pipeline failed: {}", message);
    shared.handler.log(message.clone());
    tracker.failed(completed, &message);
    shared.update(|run| {
        run.state = TaskState::Failed;
        run.error = Some(message);
        run.finished_at = Some(Utc::now());
    });
}

fn cancel(
    shared: &TaskShared,
    tracker: &TaskProgressTracker,
    completed: usize,
    data: PipelineIntermediate,
) {
    warn!(completed_steps = completed, "pipeline cancelled");
    tracker.cancelled(completed);
    shared.update(|run| {
        run.state = TaskState::Cancelled;
        run.completed_steps = completed;
        run.result = Some(data);
        run.finished_at = Some(Utc::now());
    });
}
