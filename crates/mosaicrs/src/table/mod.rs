//! The data carried between pipeline steps.

pub mod documents;
pub mod intermediate;

pub use documents::{stringify_cell, DocumentTable, Record};
pub use intermediate::{PipelineIntermediate, TEXT_ROLE};
