//! Shared routine for steps that map one input column to one output column,
//! row by row, through the task's content-addressed cache.

use serde_json::Value;
use tracing::debug;

use crate::error::{RowError, StepError};
use crate::handler::{fingerprint, CachedRow, StepHandler};
use crate::table::PipelineIntermediate;

/// What a row-wise step reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct RowJob<'a> {
    /// Step name used in diagnostics and row errors.
    pub step: &'a str,
    pub input_column: &'a str,
    pub output_column: &'a str,
    /// Identifies the computation, including any configuration that changes
    /// its output, so equal inputs of different computations never collide.
    pub salt: &'a str,
    /// Extra columns handed to the transform alongside the input, e.g. the
    /// document language. They are part of the fingerprint.
    pub context_columns: &'a [&'a str],
}

/// The raw values of one row as seen by a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInput {
    pub text: String,
    pub context: Vec<String>,
}

impl RowInput {
    /// Value of the `index`-th context column, `""` when absent.
    pub fn context(&self, index: usize) -> &str {
        self.context.get(index).map(String::as_str).unwrap_or_default()
    }

    fn cache_key(&self) -> String {
        if self.context.is_empty() {
            return self.text.clone();
        }
        let mut key = self.text.clone();
        for value in &self.context {
            key.push('\u{1f}');
            key.push_str(value);
        }
        key
    }
}

/// A transform's output for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutput {
    pub value: Value,
    /// Semantic role to assign to the output column.
    pub column_type: Option<String>,
}

impl RowOutput {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            column_type: None,
        }
    }

    pub fn typed(value: impl Into<Value>, column_type: &str) -> Self {
        Self {
            value: value.into(),
            column_type: Some(column_type.to_string()),
        }
    }
}

/// Result of one pass over the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    pub processed: usize,
    pub total: usize,
    pub cache_hits: usize,
    pub cancelled: bool,
}

/// Runs `transform` over every row of `job.input_column`.
///
/// Rows are visited in order. Cancellation is checked before each row; once
/// requested, the remaining rows are left unprocessed and receive `null` in
/// the output column so the table keeps its row count. Identical inputs are
/// served from the handler's cache without calling `transform` again.
///
/// After the pass the output column is written, a history snapshot is
/// appended and the output column's semantic role is recorded if the
/// transform produced one. A missing input column is logged and leaves the
/// table untouched (`Ok(None)`). The first failing row aborts the step.
pub fn process_rows<F>(
    data: &mut PipelineIntermediate,
    handler: &StepHandler,
    job: &RowJob<'_>,
    mut transform: F,
) -> Result<Option<RowOutcome>, StepError>
where
    F: FnMut(&RowInput, &StepHandler) -> Result<RowOutput, RowError>,
{
    let Some(inputs) = data.documents.column_strings(job.input_column) else {
        handler.log(format!(
            "{} - input column '{}' not in the documents table.",
            job.step, job.input_column
        ));
        return Ok(None);
    };

    let context: Vec<Vec<String>> = job
        .context_columns
        .iter()
        .map(|column| {
            data.documents
                .column_strings(column)
                .unwrap_or_else(|| vec![String::new(); inputs.len()])
        })
        .collect();

    let total = inputs.len();
    let mut outputs = Vec::with_capacity(total);
    let mut column_type = None;
    let mut cache_hits = 0;
    let mut cancelled = false;

    handler.update_progress(0, total);

    for (row, text) in inputs.into_iter().enumerate() {
        if handler.should_cancel() {
            cancelled = true;
            break;
        }

        let input = RowInput {
            text,
            context: context.iter().map(|values| values[row].clone()).collect(),
        };
        let key = fingerprint(job.salt, &input.cache_key());

        let cached = match handler.get_cache(&key) {
            Some(cached) => {
                cache_hits += 1;
                cached
            }
            None => {
                let output = transform(&input, handler).map_err(|e| StepError::RowFailed {
                    step: job.step.to_string(),
                    row,
                    reason: e.to_string(),
                })?;
                let cached = CachedRow {
                    output: output.value,
                    column_type: output.column_type,
                };
                handler.put_cache(key, cached.clone());
                cached
            }
        };

        if cached.column_type.is_some() {
            column_type = cached.column_type;
        }
        outputs.push(cached.output);
        handler.increment_progress();
    }

    let processed = outputs.len();
    outputs.resize(total, Value::Null);

    data.documents.set_column(job.output_column, outputs)?;
    data.record_history();

    if let Some(role) = column_type {
        data.set_column_type(job.output_column, &role);
    }

    debug!(
        step = job.step,
        processed, total, cache_hits, cancelled, "row pass finished"
    );

    Ok(Some(RowOutcome {
        processed,
        total,
        cache_hits,
        cancelled,
    }))
}
