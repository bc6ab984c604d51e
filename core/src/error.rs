//! Error taxonomy for loading and aggregating evaluation runs.
//!
//! Only [`EvaluationError::MissingInputPath`] and [`EvaluationError::Io`] are
//! fatal; the other variants are contained where they occur (a row is dropped,
//! a file is skipped) and surface as warnings.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    /// No results directory was supplied
    #[error("no csv folder path provided")]
    MissingInputPath,
    /// A run file could not be parsed at all
    #[error("unreadable result file {}: {reason}", .path.display())]
    UnreadableFile { path: PathBuf, reason: String },
    /// A single row failed validation
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    /// A file name that is neither `baseline` nor `<parameter>_<weight>`
    #[error("invalid run identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EvaluationError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(line: u64, reason: impl ToString) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_identifier(identifier: &str, reason: impl ToString) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error stops the whole evaluation rather than one file or row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingInputPath | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, EvaluationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_path_and_io_errors_are_fatal() {
        assert!(EvaluationError::MissingInputPath.is_fatal());
        assert!(EvaluationError::from(std::io::Error::other("boom")).is_fatal());
        assert!(!EvaluationError::malformed(3, "bad").is_fatal());
        assert!(!EvaluationError::unreadable("a.csv", "bad").is_fatal());
        assert!(!EvaluationError::invalid_identifier("x", "bad").is_fatal());
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = EvaluationError::unreadable("runs/a.csv", "missing column 'evaluated'");
        assert_eq!(
            err.to_string(),
            "unreadable result file runs/a.csv: missing column 'evaluated'"
        );
        let err = EvaluationError::invalid_identifier("foo_1", "unknown parameter");
        assert_eq!(
            err.to_string(),
            "invalid run identifier 'foo_1': unknown parameter"
        );
    }
}
