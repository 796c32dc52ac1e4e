use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use super::runner::{run_pipeline, RunInput, TaskShared};
use super::status::{TaskState, TaskStatus};
use crate::broadcast::{TaskProgressBroadcaster, TaskProgressTracker};
use crate::definition::{parse_definition, PipelineDefinition};
use crate::error::{DefinitionError, TaskError};
use crate::handler::{CacheStats, ResultCache, StepHandler};
use crate::steps::StepRegistry;
use crate::table::{DocumentTable, PipelineIntermediate};

struct PendingRun {
    definition: PipelineDefinition,
    documents: DocumentTable,
    registry: Arc<StepRegistry>,
    broadcaster: Option<TaskProgressBroadcaster>,
}

/// A single pipeline execution on its own worker thread.
///
/// `start` returns immediately; `status` may be called from any thread at any
/// time and never waits for the run; `cancel` requests cooperative
/// cancellation and joins the worker. A task runs at most once.
pub struct PipelineTask {
    id: String,
    shared: Arc<TaskShared>,
    pending: Mutex<Option<PendingRun>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    done_sender: Mutex<Option<Sender<()>>>,
    done_receiver: Receiver<()>,
}

impl PipelineTask {
    pub fn new(definition: PipelineDefinition, registry: Arc<StepRegistry>) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let shared = Arc::new(TaskShared::new(id.clone(), definition.len()));
        let (done_sender, done_receiver) = bounded(1);

        Self {
            id,
            shared,
            pending: Mutex::new(Some(PendingRun {
                definition,
                documents: DocumentTable::new(),
                registry,
                broadcaster: None,
            })),
            worker: Mutex::new(None),
            done_sender: Mutex::new(Some(done_sender)),
            done_receiver,
        }
    }

    /// Parses a JSON submission and creates a task for it.
    pub fn from_json(content: &str, registry: Arc<StepRegistry>) -> Result<Self, DefinitionError> {
        Ok(Self::new(parse_definition(content)?, registry))
    }

    /// Documents the first step receives.
    pub fn with_documents(mut self, documents: DocumentTable) -> Self {
        if let Ok(Some(pending)) = self.pending.get_mut() {
            pending.documents = documents;
        }
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: TaskProgressBroadcaster) -> Self {
        if let Ok(Some(pending)) = self.pending.get_mut() {
            pending.broadcaster = Some(broadcaster);
        }
        self
    }

    /// Replaces the task-scoped in-memory cache with another backend.
    pub fn with_cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.handler = StepHandler::with_cache(cache);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Spawns the worker and returns without waiting for it.
    pub fn start(&self) -> Result<(), TaskError> {
        // Held until the handle is stored so `cancel` never sees a running
        // worker without its handle.
        let mut worker = lock_worker(&self.worker);

        let pending = self
            .pending
            .lock()
            .ok()
            .and_then(|mut p| p.take())
            .ok_or_else(|| TaskError::AlreadyStarted(self.id.clone()))?;

        let total_steps = pending.definition.len();
        let tracker = match &pending.broadcaster {
            Some(broadcaster) => broadcaster.track(&self.id, total_steps),
            None => TaskProgressTracker::detached(&self.id, total_steps),
        };
        let input = RunInput {
            definition: pending.definition,
            documents: pending.documents,
            registry: pending.registry,
            tracker,
        };

        self.shared.update(|run| {
            run.state = TaskState::Running;
            run.current_step = "Starting...".to_string();
            run.started_at = Some(Utc::now());
        });

        let shared = Arc::clone(&self.shared);
        let done = self.done_sender.lock().ok().and_then(|mut s| s.take());

        let handle = thread::Builder::new()
            .name(format!("pipeline-{}", self.id))
            .spawn(move || {
                run_pipeline(&shared, input);
                if let Some(done) = done {
                    let _ = done.send(());
                }
            })
            .map_err(|e| {
                self.shared.update(|run| {
                    run.state = TaskState::Failed;
                    run.error = Some(e.to_string());
                    run.finished_at = Some(Utc::now());
                });
                TaskError::SpawnFailed {
                    id: self.id.clone(),
                    source: e,
                }
            })?;

        *worker = Some(handle);

        info!("Task {} started with {} steps", self.id, total_steps);
        Ok(())
    }

    /// Consistent snapshot of the task's progress and, once available, its result.
    pub fn status(&self) -> TaskStatus {
        let run = match self.shared.run.read() {
            Ok(run) => run,
            Err(poisoned) => poisoned.into_inner(),
        };
        let handler = &self.shared.handler;
        TaskStatus::capture(&self.id, &run, handler.progress(), handler.log_entries())
    }

    /// Requests cancellation and blocks until the worker has exited.
    ///
    /// The active step finishes the item it is working on; nothing runs after
    /// this returns. Cancelling a task that never started marks it cancelled;
    /// cancelling a finished task has no effect.
    pub fn cancel(&self) -> Result<(), TaskError> {
        self.shared.handler.request_cancel();

        // Held through the join: a concurrent `start` or `cancel` waits until
        // the worker is gone.
        let mut worker = lock_worker(&self.worker);
        match worker.take() {
            Some(handle) => {
                debug!("Task {} waiting for worker to stop", self.id);
                if handle.join().is_err() {
                    error!("Worker for task {} panicked", self.id);
                    return Err(TaskError::WorkerPanicked(self.id.clone()));
                }
                info!("Task {} stopped ({})", self.id, self.state());
            }
            None => {
                let never_started = self
                    .pending
                    .lock()
                    .ok()
                    .and_then(|mut p| p.take())
                    .is_some();
                if never_started {
                    self.shared.update(|run| {
                        run.state = TaskState::Cancelled;
                        run.finished_at = Some(Utc::now());
                    });
                    if let Ok(mut sender) = self.done_sender.lock() {
                        sender.take();
                    }
                    info!("Task {} cancelled before start", self.id);
                }
            }
        }

        Ok(())
    }

    /// Blocks until the task reaches a terminal state or `timeout` elapses.
    /// Returns whether the task has finished.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.state().is_terminal() {
            return true;
        }
        match self.done_receiver.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => self.state().is_terminal(),
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// Copy of the result table, including history. Present once the task has
    /// completed, or with the partial table of a cancelled run.
    pub fn result_table(&self) -> Option<PipelineIntermediate> {
        match self.shared.run.read() {
            Ok(run) => run.result.clone(),
            Err(poisoned) => poisoned.into_inner().result.clone(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.handler.cache_stats()
    }
}

fn lock_worker(worker: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    match worker.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Drop for PipelineTask {
    fn drop(&mut self) {
        // Stop a still-running worker rather than leave it detached.
        if let Ok(Some(handle)) = self.worker.get_mut().map(|w| w.take()) {
            self.shared.handler.request_cancel();
            let _ = handle.join();
        }
    }
}
