/// Runner error types
use std::path::PathBuf;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that stop the runner itself.
///
/// Failures raised by suites never surface here; they are recorded in the
/// [`RunRecord`](crate::RunRecord) instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to prepare results directory {path}: {error}")]
    ResultsDirectory {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to switch working directory to {path}: {error}")]
    WorkingDirectory {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to start the scheduler runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Failed to write report to {path}: {error}")]
    ReportWrite {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to render report: {0}")]
    ReportRender(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create a results directory error
    pub fn results_directory(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::ResultsDirectory {
            path: path.into(),
            error,
        }
    }

    /// Create a report write error
    pub fn report_write(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::ReportWrite {
            path: path.into(),
            error,
        }
    }
}
