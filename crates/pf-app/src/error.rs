//! Error types for the orchestration layer.
//!
//! Business-rule problems never surface here; they become [`crate::Warning`]s.

use pf_solver::SolverError;
use pf_stages::StageError;
use pf_streams::StreamError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Project error: {0}")]
    Project(#[from] pf_project::ProjectError),
}

/// Result type for pf-app operations.
pub type AppResult<T> = Result<T, AppError>;
