//! Field paths addressing one tunable value.
//!
//! - `<stage_key>.<criterion_key>`
//! - `<stage_key>.removal.<analyte_key>`
//! - `thresholds.<name>`
//! - `solver.<name>`

use crate::criteria::Criterion;
use crate::error::StageError;
use crate::kind::StageKind;
use pf_streams::Analyte;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Criterion { stage: StageKind, criterion: Criterion },
    Removal { stage: StageKind, analyte: Analyte },
    Threshold(String),
    Solver(String),
}

impl FromStr for FieldPath {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || StageError::UnknownFieldPath {
            path: s.to_string(),
        };
        let parts: Vec<&str> = s.trim().split('.').collect();
        match parts.as_slice() {
            ["thresholds", name] if !name.is_empty() => Ok(FieldPath::Threshold(name.to_string())),
            ["solver", name] if !name.is_empty() => Ok(FieldPath::Solver(name.to_string())),
            [stage, "removal", analyte] => Ok(FieldPath::Removal {
                stage: StageKind::from_key(stage).ok_or_else(unknown)?,
                analyte: Analyte::from_key(analyte).ok_or_else(unknown)?,
            }),
            [stage, criterion] => Ok(FieldPath::Criterion {
                stage: StageKind::from_key(stage).ok_or_else(unknown)?,
                criterion: Criterion::from_key(criterion).ok_or_else(unknown)?,
            }),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Criterion { stage, criterion } => {
                write!(f, "{}.{}", stage.key(), criterion.key())
            }
            FieldPath::Removal { stage, analyte } => {
                write!(f, "{}.removal.{}", stage.key(), analyte.key())
            }
            FieldPath::Threshold(name) => write!(f, "thresholds.{name}"),
            FieldPath::Solver(name) => write!(f, "solver.{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_shape() {
        assert_eq!(
            "activated_sludge.hydraulic_retention_time".parse::<FieldPath>().unwrap(),
            FieldPath::Criterion {
                stage: StageKind::ActivatedSludge,
                criterion: Criterion::HydraulicRetentionTime
            }
        );
        assert_eq!(
            "primary_clarifier.removal.tss".parse::<FieldPath>().unwrap(),
            FieldPath::Removal {
                stage: StageKind::PrimaryClarifier,
                analyte: Analyte::Tss
            }
        );
        assert_eq!(
            "thresholds.phosphorus_mg_l".parse::<FieldPath>().unwrap(),
            FieldPath::Threshold("phosphorus_mg_l".into())
        );
        assert_eq!(
            "solver.tolerance".parse::<FieldPath>().unwrap(),
            FieldPath::Solver("tolerance".into())
        );
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "digestion.biogas_yield",
            "tertiary_filtration.removal.total_phosphorus",
            "thresholds.daf_fog_mg_l",
            "solver.max_iterations",
        ] {
            assert_eq!(text.parse::<FieldPath>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn rejects_unknown_paths() {
        for text in ["", "clarifier.sor", "activated_sludge", "a.b.c.d", "digestion.removal.bogus"] {
            assert!(matches!(
                text.parse::<FieldPath>(),
                Err(StageError::UnknownFieldPath { .. })
            ));
        }
    }
}
