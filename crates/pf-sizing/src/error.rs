//! Error types for equipment sizing.

use pf_core::PfError;
use pf_stages::StageError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    #[error("Non-physical sizing value: {what}")]
    NonPhysical { what: &'static str },

    #[error("{item} spec '{spec}' is non-physical: {value}")]
    NonPhysicalSpec {
        item: String,
        spec: String,
        value: f64,
    },

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),
}

pub type SizingResult<T> = Result<T, SizingError>;

impl From<SizingError> for PfError {
    fn from(e: SizingError) -> Self {
        match e {
            SizingError::NonPhysical { what } => PfError::NonFinite { what, value: f64::NAN },
            SizingError::NonPhysicalSpec { value, .. } => PfError::NonFinite {
                what: "equipment spec",
                value,
            },
            SizingError::Stage(inner) => inner.into(),
        }
    }
}
