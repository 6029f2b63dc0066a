//! Error types for stage evaluation and table calibration.

use crate::criteria::Criterion;
use crate::kind::StageKind;
use pf_core::PfError;
use pf_streams::{StreamClass, StreamError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("{stage} expects a {expected:?} influent, got {found:?}")]
    ClassMismatch {
        stage: StageKind,
        expected: StreamClass,
        found: StreamClass,
    },

    #[error("{stage} has no design criterion '{}'", criterion.key())]
    MissingCriterion {
        stage: StageKind,
        criterion: Criterion,
    },

    #[error("Unknown field path: {path}")]
    UnknownFieldPath { path: String },

    #[error("Invalid override {path} = {value}: {reason}")]
    InvalidOverride {
        path: String,
        value: f64,
        reason: &'static str,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

pub type StageResult<T> = Result<T, StageError>;

impl From<StageError> for PfError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::ClassMismatch { .. } => PfError::Invariant {
                what: "stage influent class",
            },
            StageError::MissingCriterion { .. } => PfError::Invariant {
                what: "missing design criterion",
            },
            StageError::UnknownFieldPath { .. } | StageError::InvalidOverride { .. } => {
                PfError::InvalidArg { what: "override" }
            }
            StageError::Stream(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StageError::MissingCriterion {
            stage: StageKind::PrimaryClarifier,
            criterion: Criterion::SurfaceOverflowRate,
        };
        let msg = err.to_string();
        assert!(msg.contains("Primary Clarifier"));
        assert!(msg.contains("surface_overflow_rate"));
    }

    #[test]
    fn error_conversion() {
        let err = StageError::UnknownFieldPath { path: "x.y".into() };
        let pf: PfError = err.into();
        assert!(matches!(pf, PfError::InvalidArg { .. }));
    }
}
