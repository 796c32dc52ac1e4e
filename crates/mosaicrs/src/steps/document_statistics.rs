use serde_json::{json, Value};

use super::{ParameterSpec, Step, StepInfo, StepParameters};
use crate::error::{ParameterError, StepError};
use crate::handler::StepHandler;
use crate::table::PipelineIntermediate;

pub const STEP_ID: &str = "document_statistics";
const STEP_NAME: &str = "Document Statistics";

/// Whole-table step that appends one row of counts to the metadata table.
///
/// Leaves the documents untouched, so no history entry is written.
#[derive(Debug, Clone, Default)]
pub struct DocumentStatistics {
    column: Option<String>,
}

impl DocumentStatistics {
    pub fn new(column: Option<&str>) -> Self {
        Self {
            column: column.map(str::to_string),
        }
    }

    pub fn from_parameters(params: &StepParameters) -> Result<Self, ParameterError> {
        Ok(Self::new(params.optional_text("column")))
    }

    pub fn info() -> StepInfo {
        StepInfo::new(
            STEP_NAME,
            "Analysis",
            "Records the number of documents, columns and empty texts in the metadata table.",
        )
        .parameter(
            "column",
            ParameterSpec::text(
                "Text column name",
                "Column checked for empty texts. Defaults to the current text column.",
            ),
        )
    }
}

impl Step for DocumentStatistics {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn transform(
        &self,
        mut data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        handler.update_progress(0, 1);
        if handler.should_cancel() {
            return Ok(data);
        }

        let column = self
            .column
            .clone()
            .or_else(|| data.text_column().map(str::to_string));

        let empty_texts = match column.as_deref() {
            Some(name) => match data.documents.column_strings(name) {
                Some(texts) => Value::from(texts.iter().filter(|t| t.trim().is_empty()).count()),
                None => {
                    handler.log(format!(
                        "{} - column '{}' not in the documents table.",
                        STEP_NAME, name
                    ));
                    Value::Null
                }
            },
            None => Value::Null,
        };

        let row = json!({
            "step": STEP_NAME,
            "documents": data.documents.len(),
            "columns": data.documents.column_count(),
            "column": column,
            "emptyTexts": empty_texts,
        });
        if let Value::Object(record) = row {
            data.metadata.push_row(record);
        }

        handler.increment_progress();
        Ok(data)
    }
}
