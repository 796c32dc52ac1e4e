use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::Stemmer;

use super::language::Language;
use super::row_processor::{process_rows, RowJob, RowOutput};
use super::{ParameterSpec, Step, StepInfo, StepParameters};
use crate::error::{ParameterError, StepError};
use crate::handler::StepHandler;
use crate::table::{PipelineIntermediate, TEXT_ROLE};

pub const STEP_ID: &str = "stemmer";
const STEP_NAME: &str = "Text Stemmer";
const FINGERPRINT_SALT: &str = "rule-based";

// Words, or runs of punctuation, as separate tokens.
static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").unwrap());

/// Snowball stemming of a text column, language chosen per document.
#[derive(Debug, Clone)]
pub struct TextStemmer {
    input_column: String,
    output_column: String,
    language_column: String,
}

impl TextStemmer {
    pub fn new(input_column: &str, output_column: &str, language_column: &str) -> Self {
        Self {
            input_column: input_column.to_string(),
            output_column: output_column.to_string(),
            language_column: language_column.to_string(),
        }
    }

    pub fn from_parameters(params: &StepParameters) -> Result<Self, ParameterError> {
        Ok(Self::new(
            params.text("input")?,
            params.text("output")?,
            params.text("language_column")?,
        ))
    }

    pub fn info() -> StepInfo {
        let languages: Vec<String> = Language::ALL.iter().map(|l| l.to_string()).collect();
        StepInfo::new(
            STEP_NAME,
            "Pre-Processing",
            &format!(
                "Text-based pre-processing step: Stemming of given column. Supported languages: {}",
                languages.join(", ")
            ),
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
                "The pre-processed text will be put into this column.",
                &["cleaned-text", "full-text"],
            )
            .required()
            .default_value("cleaned-text"),
        )
        .parameter(
            "language_column",
            ParameterSpec::dropdown(
                "Language column name",
                "The column containing the ISO 639-3 language code of each document.",
                &["language"],
            )
            .default_value("language"),
        )
    }

    /// One stemmer per supported language that occurs in the table.
    fn stemmers_for(&self, data: &PipelineIntermediate) -> HashMap<Language, Stemmer> {
        let codes: BTreeSet<String> = data
            .documents
            .column_strings(&self.language_column)
            .unwrap_or_default()
            .into_iter()
            .collect();

        codes
            .iter()
            .filter_map(|code| Language::from_code(code))
            .map(|language| (language, Stemmer::create(language.algorithm())))
            .collect()
    }
}

impl Step for TextStemmer {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn transform(
        &self,
        mut data: PipelineIntermediate,
        handler: &StepHandler,
    ) -> Result<PipelineIntermediate, StepError> {
        let stemmers = self.stemmers_for(&data);
        let mut unsupported = BTreeSet::new();

        let language_column = self.language_column.as_str();
        let context_columns = [language_column];
        let job = RowJob {
            step: STEP_NAME,
            input_column: &self.input_column,
            output_column: &self.output_column,
            salt: FINGERPRINT_SALT,
            context_columns: &context_columns,
        };

        let outcome = process_rows(&mut data, handler, &job, |row, _| {
            let code = row.context(0);
            let stemmed = Language::from_code(code)
                .and_then(|language| stemmers.get(&language))
                .map(|stemmer| stem_text(&row.text, stemmer));

            match stemmed {
                Some(text) => Ok(RowOutput::typed(text, TEXT_ROLE)),
                None => {
                    unsupported.insert(if code.is_empty() {
                        "<missing>".to_string()
                    } else {
                        code.to_string()
                    });
                    Ok(RowOutput::typed(row.text.clone(), TEXT_ROLE))
                }
            }
        })?;

        if !unsupported.is_empty() {
            let languages: Vec<String> = unsupported.into_iter().collect();
            handler.log(format!(
                "Languages: {} are not supported for stemming.",
                languages.join(", ")
            ));
        }

        if outcome.is_some() {
            data.set_text_column(&self.output_column);
        }

        Ok(data)
    }
}

/// Stems every word token and joins all tokens with single spaces.
pub fn stem_text(text: &str, stemmer: &Stemmer) -> String {
    RE_TOKEN
        .find_iter(text)
        .map(|token| {
            let token = token.as_str();
            if token.chars().any(char::is_alphanumeric) {
                stemmer.stem(&token.to_lowercase()).into_owned()
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
