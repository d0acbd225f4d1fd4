//! Bank statement ingestion: mapping configurations, parsing and import

pub mod amount;
pub mod detect;
pub mod import;
pub mod mapping;
pub mod parser;
pub mod tokenizer;

pub use detect::{ColumnLayout, ColumnRole, DetectedLayout};
pub use import::*;
pub use mapping::*;
pub use parser::*;

use crate::types::NormalizedBankMovement;

/// Why a single statement row was skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row has no {role} column at index {index}")]
    MissingColumn { role: ColumnRole, index: usize },
    #[error("no {0} column could be detected")]
    UndetectedColumn(ColumnRole),
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
}

/// A row the parser could not turn into a movement
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line number in the original content
    pub line: usize,
    pub content: String,
    pub reason: RowError,
}

/// Outcome of parsing one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedStatement {
    /// Successfully parsed rows, in file order
    pub movements: Vec<NormalizedBankMovement>,
    pub skipped: Vec<SkippedRow>,
    /// Line numbers whose date could not be parsed and got the fallback date
    pub date_fallbacks: Vec<usize>,
}

impl ParsedStatement {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }
}
