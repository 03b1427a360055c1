//! Panel Data
//!
//! Long-format panel datasets (one row per subject per time point), the
//! Markov transform that turns them into lagged/led wide columns, and the
//! assembler that aligns those columns on complete cases.

pub mod assemble;
pub mod dataset;
pub mod frame;
pub mod transform;

pub use assemble::{DataDict, DataDictBuilder, VariableRoles};
pub use dataset::{PanelDataset, PanelSchema};
pub use frame::{Column, ColumnData, Frame, RowKey};
pub use transform::{markov_transform, MarkovFrames};

/// Error types for panel data handling
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// A required column is not present
    MissingColumn(String),
    /// Two columns share a name
    DuplicateColumn(String),
    /// Complete-case filtering removed every row
    NoCompleteRows,
    /// Column holds text where numbers are needed
    NonNumeric(String),
    /// Two rows share a (subject, time) key
    DuplicateRow { subject: String, time: f64 },
    /// A cell could not be interpreted
    InvalidValue(String),
    /// Neither a graph nor explicit static/dynamic lists were supplied
    MissingRoles(String),
    /// CSV reader error
    Csv(String),
    /// Column length does not match the row index
    LengthMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::MissingColumn(name) => write!(f, "Column not found in data: {}", name),
            DataError::DuplicateColumn(name) => write!(f, "Duplicate column: {}", name),
            DataError::NoCompleteRows => write!(
                f,
                "No rows left after dropping rows with missing values"
            ),
            DataError::NonNumeric(name) => write!(f, "Column {} is not numeric", name),
            DataError::DuplicateRow { subject, time } => write!(
                f,
                "Duplicate observation for subject {} at time {}",
                subject, time
            ),
            DataError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            DataError::MissingRoles(msg) => write!(f, "Missing variable roles: {}", msg),
            DataError::Csv(msg) => write!(f, "CSV error: {}", msg),
            DataError::LengthMismatch { expected, found } => write!(
                f,
                "Column length mismatch: expected {} rows, found {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for DataError {}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv(err.to_string())
    }
}
