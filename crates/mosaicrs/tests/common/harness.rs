//! Test harness for task-level integration tests.
//!
//! `TestHarness` owns a registry with the built-in steps plus a few
//! instrumented ones:
//! - `record`: appends its `label` parameter to a shared list, touches no rows
//! - `slow_upper`: upper-cases a column row by row, sleeping per computed row
//!   and counting every invocation of its transform
//! - `fail_on`: copies a column but fails on rows whose text is `boom`

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mosaicrs::error::RowError;
use mosaicrs::steps::{process_rows, RowJob, RowOutput};
use mosaicrs::{
    DocumentTable, ParameterSpec, PipelineDefinition, PipelineIntermediate, PipelineTask, Step,
    StepError, StepHandler, StepInfo, StepRegistry, TaskStatus,
};

pub const WAIT: Duration = Duration::from_secs(30);

/// Labels appended by `record` steps, in execution order.
pub type Recorded = Arc<Mutex<Vec<String>>>;

struct RecordStep {
    label: String,
    recorded: Recorded,
}

impl Step for RecordStep {
    fn name(&self) -> &str {
        &self.label
    }

    fn transform(
        &self,
        data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        handler.update_progress(0, 1);
        self.recorded.lock().unwrap().push(self.label.clone());
        handler.increment_progress();
        Ok(data)
    }
}

struct SlowUpperStep {
    input: String,
    output: String,
    delay: Duration,
    invocations: Arc<AtomicUsize>,
}

impl Step for SlowUpperStep {
    fn name(&self) -> &str {
        "Slow Upper"
    }

    fn transform(
        &self,
        mut data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        let job = RowJob {
            step: "Slow Upper",
            input_column: &self.input,
            output_column: &self.output,
            salt: "slow-upper",
            context_columns: &[],
        };
        process_rows(&mut data, handler, &job, |row, _| {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(RowOutput::new(row.text.to_uppercase()))
        })?;
        Ok(data)
    }
}

struct FailOnStep {
    input: String,
}

impl Step for FailOnStep {
    fn name(&self) -> &str {
        "Fail On Boom"
    }

    fn transform(
        &self,
        mut data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        let job = RowJob {
            step: "Fail On Boom",
            input_column: &self.input,
            output_column: "copy",
            salt: "fail-on",
            context_columns: &[],
        };
        process_rows(&mut data, handler, &job, |row, _| {
            if row.text == "boom" {
                return Err(RowError::new("text exploded"));
            }
            Ok(RowOutput::new(row.text.clone()))
        })?;
        Ok(data)
    }
}

/// Registry and shared counters for driving tasks in tests.
pub struct TestHarness {
    pub registry: Arc<StepRegistry>,
    pub recorded: Recorded,
    pub invocations: Arc<AtomicUsize>,
}

impl TestHarness {
    /// Harness whose `slow_upper` step sleeps 1ms per computed row.
    pub fn new() -> Self {
        Self::with_row_delay(Duration::from_millis(1))
    }

    pub fn with_row_delay(delay: Duration) -> Self {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let invocations = Arc::new(AtomicUsize::new(0));
        let mut registry = StepRegistry::with_builtin_steps();

        let sink = Arc::clone(&recorded);
        registry.register(
            "record",
            StepInfo::new("Record", "Test", "Records its label")
                .parameter("label", ParameterSpec::text("Label", "Recorded label").required()),
            move |params| {
                Ok(Box::new(RecordStep {
                    label: params.text("label")?.to_string(),
                    recorded: Arc::clone(&sink),
                }))
            },
        );

        let counter = Arc::clone(&invocations);
        registry.register(
            "slow_upper",
            StepInfo::new("Slow Upper", "Test", "Upper-cases a column slowly")
                .parameter("input", ParameterSpec::text("Input", "Input column").required())
                .parameter(
                    "output",
                    ParameterSpec::text("Output", "Output column").default_value("upper"),
                ),
            move |params| {
                Ok(Box::new(SlowUpperStep {
                    input: params.text("input")?.to_string(),
                    output: params.text("output")?.to_string(),
                    delay,
                    invocations: Arc::clone(&counter),
                }))
            },
        );

        registry.register(
            "fail_on",
            StepInfo::new("Fail On Boom", "Test", "Fails on 'boom'")
                .parameter("input", ParameterSpec::text("Input", "Input column").required()),
            |params| {
                Ok(Box::new(FailOnStep {
                    input: params.text("input")?.to_string(),
                }))
            },
        );

        Self {
            registry: Arc::new(registry),
            recorded,
            invocations,
        }
    }

    pub fn task(&self, definition: PipelineDefinition, documents: DocumentTable) -> PipelineTask {
        PipelineTask::new(definition, Arc::clone(&self.registry)).with_documents(documents)
    }

    /// Start a task and block until it reaches a terminal state.
    pub fn run(&self, definition: PipelineDefinition, documents: DocumentTable) -> TaskStatus {
        let task = self.task(definition, documents);
        task.start().expect("Task should start");
        assert!(task.wait(WAIT), "Task did not finish in time");
        task.status()
    }

    pub fn recorded(&self) -> Vec<String> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

/// Poll `status` until `predicate` holds, panicking after `WAIT`.
pub fn wait_until<F>(task: &PipelineTask, predicate: F) -> TaskStatus
where
    F: Fn(&TaskStatus) -> bool,
{
    let deadline = Instant::now() + WAIT;
    loop {
        let status = task.status();
        if predicate(&status) {
            return status;
        }
        assert!(Instant::now() < deadline, "Condition not reached: {:?}", status.state);
        thread::sleep(Duration::from_millis(2));
    }
}

/// Splits a `"current/total"` progress string.
pub fn parse_progress(progress: &str) -> (usize, usize) {
    let (current, total) = progress
        .split_once('/')
        .expect("Progress should look like 'current/total'");
    (current.parse().unwrap(), total.parse().unwrap())
}
