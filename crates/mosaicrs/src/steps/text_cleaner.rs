use std::sync::LazyLock;

use regex::Regex;

use super::row_processor::{process_rows, RowJob, RowOutput};
use super::{ParameterSpec, Step, StepInfo, StepParameters};
use crate::error::{ParameterError, StepError};
use crate::handler::StepHandler;
use crate::table::{PipelineIntermediate, TEXT_ROLE};

pub const STEP_ID: &str = "text_cleaner";
const STEP_NAME: &str = "Text Cleaner";

static RE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{P}\p{S}]+").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strips punctuation and symbols and collapses whitespace.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    input_column: String,
    output_column: String,
    lowercase: bool,
    salt: String,
}

impl TextCleaner {
    pub fn new(input_column: &str, output_column: &str, lowercase: bool) -> Self {
        Self {
            input_column: input_column.to_string(),
            output_column: output_column.to_string(),
            lowercase,
            salt: format!("text-cleaner:lowercase={}", lowercase),
        }
    }

    pub fn from_parameters(params: &StepParameters) -> Result<Self, ParameterError> {
        Ok(Self::new(
            params.text("input")?,
            params.text("output")?,
            params.flag("lowercase")?,
        ))
    }

    pub fn info() -> StepInfo {
        StepInfo::new(
            STEP_NAME,
            "Pre-Processing",
            "Text-based pre-processing step: removes punctuation and symbols and normalizes whitespace.",
        )
        .parameter(
            "input",
            ParameterSpec::dropdown(
                "Input column name",
                "The pre-processing steps will be performed on this column.",
                &["full-text", "summary", "cleaned-text"],
            )
            .required(),
        )
        .parameter(
            "output",
            ParameterSpec::dropdown(
                "Output column name",
                "The cleaned text will be put into this column.",
                &["cleaned-text", "full-text"],
            )
            .required()
            .default_value("cleaned-text"),
        )
        .parameter(
            "lowercase",
            ParameterSpec::boolean("Lowercase", "Convert the cleaned text to lower case.")
                .default_value(false),
        )
    }

    pub fn clean(&self, text: &str) -> String {
        let stripped = RE_PUNCTUATION.replace_all(text, " ");
        let collapsed = RE_WHITESPACE.replace_all(stripped.trim(), " ");
        if self.lowercase {
            collapsed.to_lowercase()
        } else {
            collapsed.into_owned()
        }
    }
}

impl Step for TextCleaner {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn transform(
        &self,
        mut data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        let job = RowJob {
            step: STEP_NAME,
            input_column: &self.input_column,
            output_column: &self.output_column,
            salt: &self.salt,
            context_columns: &[],
        };

        process_rows(&mut data, handler, &job, |row, _| {
            Ok(RowOutput::typed(self.clean(&row.text), TEXT_ROLE))
        })?;

        Ok(data)
    }
}
