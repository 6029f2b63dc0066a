//! Simulation result and the records it carries.

use pf_core::round_to;
use pf_sizing::EquipmentItem;
use pf_solver::{ConvergenceReport, RecycleStream};
use pf_stages::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Project archetype to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Liquid,
    SolidsToGas,
    GasOnly,
    Hybrid,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Liquid,
        Variant::SolidsToGas,
        Variant::GasOnly,
        Variant::Hybrid,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Variant::Liquid => "liquid",
            Variant::SolidsToGas => "solids_to_gas",
            Variant::GasOnly => "gas_only",
            Variant::Hybrid => "hybrid",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|v| v.key() == key)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A business-rule problem found while simulating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// Input field or stage the problem is about, e.g. `feed_streams[0].flow`.
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

/// A value the engine supplied because the input did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assumption {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub value: f64,
    pub unit: &'static str,
}

/// Assumptions and warnings gathered during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub assumptions: Vec<Assumption>,
    pub warnings: Vec<Warning>,
}

impl Ledger {
    pub fn assume(&mut self, parameter: impl Into<String>, value: f64, unit: &str, source: &str) {
        self.assumptions.push(Assumption {
            parameter: parameter.into(),
            value,
            unit: unit.to_string(),
            source: source.to_string(),
        });
    }

    pub fn warn(&mut self, field: impl Into<String>, message: impl Into<String>, severity: Severity) {
        let (field, message) = (field.into(), message.into());
        match severity {
            Severity::Info => tracing::debug!(%field, %message, "note"),
            Severity::Warning | Severity::Error => tracing::warn!(%field, %message, ?severity),
        }
        self.warnings.push(Warning {
            field,
            message,
            severity,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Error)
    }
}

/// Everything one variant run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub variant: Variant,
    pub stages: Vec<Stage>,
    pub recycle_streams: Vec<RecycleStream>,
    pub equipment: Vec<EquipmentItem>,
    pub convergence: ConvergenceReport,
    pub assumptions: Vec<Assumption>,
    pub warnings: Vec<Warning>,
    pub summary: BTreeMap<String, Metric>,
}

impl SimulationResult {
    /// A result with no stages, for runs that stop on an input problem.
    pub fn empty(variant: Variant, ledger: Ledger) -> Self {
        Self {
            variant,
            stages: Vec::new(),
            recycle_streams: Vec::new(),
            equipment: Vec::new(),
            convergence: single_pass(),
            assumptions: ledger.assumptions,
            warnings: ledger.warnings,
            summary: BTreeMap::new(),
        }
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.summary.get(key).map(|m| m.value)
    }

    pub fn stage(&self, kind: pf_stages::StageKind) -> Option<&Stage> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Error)
    }
}

/// Report for pipelines without a recycle loop.
pub(crate) fn single_pass() -> ConvergenceReport {
    ConvergenceReport {
        iterations: 1,
        achieved: true,
        max_relative_change: 0.0,
    }
}

pub(crate) fn put(summary: &mut BTreeMap<String, Metric>, key: impl Into<String>, value: f64, unit: &'static str) {
    summary.insert(
        key.into(),
        Metric {
            value: round_to(value, 3),
            unit,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_keys_parse() {
        for v in Variant::ALL {
            assert_eq!(Variant::from_key(v.key()), Some(v));
        }
        assert_eq!(Variant::from_key("Solids-To-Gas"), Some(Variant::SolidsToGas));
        assert_eq!(Variant::from_key("steam"), None);
    }

    #[test]
    fn ledger_tracks_errors() {
        let mut ledger = Ledger::default();
        ledger.warn("outputs[0]", "above target", Severity::Warning);
        assert!(!ledger.has_errors());
        ledger.warn("feed_streams[0].flow", "no flow", Severity::Error);
        assert!(ledger.has_errors());
    }

    #[test]
    fn empty_result_keeps_the_ledger() {
        let mut ledger = Ledger::default();
        ledger.assume("x", 1.0, "-", "test");
        let result = SimulationResult::empty(Variant::GasOnly, ledger);
        assert!(result.stages.is_empty() && result.equipment.is_empty());
        assert_eq!(result.assumptions.len(), 1);
        assert!(result.convergence.achieved);
    }
}
