//! Engine configuration: calibration tables, thresholds and solver settings.

use pf_solver::SolverConfig;
use pf_stages::{DefaultTables, FieldPath, StageError, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the engine reads besides the project itself.
///
/// `EngineConfig::default()` is the built-in calibration. Sections missing
/// from a configuration file fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tables: DefaultTables,
    pub thresholds: Thresholds,
    pub solver: SolverConfig,
}

/// An override the engine could not apply.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOverride {
    pub path: String,
    pub value: f64,
    pub error: StageError,
}

impl EngineConfig {
    /// Apply one field-path override, changing nothing else.
    pub fn apply_override(&mut self, path: &str, value: f64) -> Result<(), StageError> {
        let field: FieldPath = path.parse()?;
        let unknown = || StageError::UnknownFieldPath {
            path: path.to_string(),
        };
        match &field {
            FieldPath::Threshold(name) => {
                if self.thresholds.set(name, value) {
                    Ok(())
                } else {
                    Err(unknown())
                }
            }
            FieldPath::Solver(name) => {
                if self.solver.set(name, value) {
                    Ok(())
                } else {
                    Err(unknown())
                }
            }
            _ => self.tables.apply_override(&field, value),
        }
    }

    /// Apply every override; returns the ones that were ignored.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, f64>) -> Vec<RejectedOverride> {
        overrides
            .iter()
            .filter_map(|(path, value)| {
                self.apply_override(path, *value)
                    .err()
                    .map(|error| RejectedOverride {
                        path: path.clone(),
                        value: *value,
                        error,
                    })
            })
            .collect()
    }

    /// Copy with the overrides applied, plus the rejected ones.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> (Self, Vec<RejectedOverride>) {
        let mut config = self.clone();
        let rejected = config.apply_overrides(overrides);
        (config, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_stages::{Criterion, StageKind};
    use pf_streams::Analyte;

    #[test]
    fn criterion_override_touches_only_its_value() {
        let base = EngineConfig::default();
        let mut config = base.clone();
        config
            .apply_override("activated_sludge.solids_retention_time", 15.0)
            .unwrap();

        let as_set = &config.tables.criteria[&StageKind::ActivatedSludge];
        assert_eq!(as_set.get(Criterion::SolidsRetentionTime).unwrap().value, 15.0);
        for (c, d) in as_set.iter().filter(|(c, _)| *c != Criterion::SolidsRetentionTime) {
            assert_eq!(Some(d), base.tables.criteria[&StageKind::ActivatedSludge].get(c));
        }
        assert_eq!(config.thresholds, base.thresholds);
        assert_eq!(config.solver, base.solver);
    }

    #[test]
    fn threshold_solver_and_removal_paths() {
        let mut config = EngineConfig::default();
        config.apply_override("thresholds.phosphorus_mg_l", 0.5).unwrap();
        config.apply_override("solver.max_iterations", 20.0).unwrap();
        config.apply_override("primary_clarifier.removal.tss", 0.7).unwrap();
        assert_eq!(config.thresholds.phosphorus_mg_l, 0.5);
        assert_eq!(config.solver.max_iterations, 20);
        assert_eq!(
            config.tables.removal[&StageKind::PrimaryClarifier].efficiency(Analyte::Tss),
            Some(0.7)
        );
    }

    #[test]
    fn unknown_paths_are_collected_not_applied() {
        let overrides: BTreeMap<String, f64> = [
            ("reactor.volume".to_string(), 1.0),
            ("thresholds.colour".to_string(), 1.0),
            ("solver.tolerance".to_string(), 0.001),
        ]
        .into_iter()
        .collect();
        let (config, rejected) = EngineConfig::default().with_overrides(&overrides);
        assert_eq!(rejected.len(), 2);
        assert!(rejected.iter().all(|r| matches!(r.error, StageError::UnknownFieldPath { .. })));
        assert_eq!(config.solver.tolerance, 0.001);
    }

    #[test]
    fn partial_yaml_keeps_other_sections() {
        let config: EngineConfig = serde_yaml::from_str("solver:\n  max_iterations: 3\n").unwrap();
        assert_eq!(config.solver.max_iterations, 3);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.tables, DefaultTables::standard());
    }
}
