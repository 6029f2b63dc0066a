//! Error types for stream construction and blending.

use crate::analyte::{Analyte, StreamClass};
use crate::units::UnitError;
use pf_core::PfError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Analyte {analyte:?} belongs to {expected:?} streams, not {found:?}")]
    ClassMismatch {
        analyte: Analyte,
        expected: StreamClass,
        found: StreamClass,
    },

    #[error("Cannot combine {left:?} and {right:?} streams")]
    IncompatibleStreams {
        left: StreamClass,
        right: StreamClass,
    },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("Gas composition sums to {total:.2} % (> 100 %)")]
    CompositionExceeded { total: f64 },

    #[error("Nothing to blend")]
    EmptyBlend,

    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),
}

pub type StreamResult<T> = Result<T, StreamError>;

impl From<StreamError> for PfError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::ClassMismatch { .. } | StreamError::IncompatibleStreams { .. } => {
                PfError::Invariant {
                    what: "stream class mismatch",
                }
            }
            StreamError::NonPhysical { .. } | StreamError::CompositionExceeded { .. } => {
                PfError::InvalidArg {
                    what: "non-physical stream value",
                }
            }
            StreamError::EmptyBlend => PfError::InvalidArg { what: "empty blend" },
            StreamError::Unit(_) => PfError::InvalidArg { what: "unit" },
        }
    }
}
