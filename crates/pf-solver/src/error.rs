//! Error types for recycle convergence.

use pf_core::PfError;
use pf_stages::StageError;
use pf_streams::StreamError;
use thiserror::Error;

/// Internal failures only; non-convergence is reported in the outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for PfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what: _ } => PfError::InvalidArg {
                what: "problem setup",
            },
            SolverError::Stage(inner) => inner.into(),
            SolverError::Stream(inner) => inner.into(),
        }
    }
}
