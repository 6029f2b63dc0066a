//! Fixed-point recycle convergence.

use crate::error::{SolverError, SolverResult};
use crate::recycle::{RecycleStream, recycles_for};
use pf_core::relative_change;
use pf_stages::{Stage, StageKind};
use pf_streams::{Analyte, Stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Convergence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Hard cap on passes
    pub max_iterations: usize,
    /// Relative change in every recycle flow below which the train is converged
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.01,
        }
    }
}

impl SolverConfig {
    /// Set a field by name. Returns false for unknown names or unusable values.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match name {
            "max_iterations" if value.is_finite() && value >= 1.0 => {
                self.max_iterations = value.round() as usize;
                true
            }
            "tolerance" if value.is_finite() && value > 0.0 => {
                self.tolerance = value;
                true
            }
            _ => false,
        }
    }
}

/// Iteration count and whether the tolerance was met.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergenceReport {
    pub iterations: usize,
    pub achieved: bool,
    /// Largest relative recycle-flow change on the final pass.
    pub max_relative_change: f64,
}

/// Final recycle set plus the convergence report.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub recycles: Vec<RecycleStream>,
    pub report: ConvergenceReport,
}

/// Run every stage in order, threading each effluent into the next influent.
pub fn chain(feed: &Stream, stages: &mut [Stage]) -> SolverResult<Stream> {
    let mut current = feed.clone();
    for stage in stages.iter_mut() {
        current = stage.evaluate(current)?.clone();
    }
    Ok(current)
}

fn head_blend(feed: &Stream, recycles: &[RecycleStream], head: StageKind) -> SolverResult<Stream> {
    let mut flow = 0.0;
    let mut loads: BTreeMap<Analyte, f64> = BTreeMap::new();
    for r in recycles.iter().filter(|r| r.destination == head) {
        flow += r.flow_m3_per_day;
        for (analyte, load) in &r.loads_kg_per_day {
            *loads.entry(*analyte).or_insert(0.0) += load;
        }
    }
    Ok(feed.with_recycled_loads(flow, &loads)?)
}

/// Converge the train against `feed`.
///
/// Each pass blends head-bound recycles into the nominal feed, re-runs every
/// stage and recomputes every recycle. The first pass compares against zero,
/// so any non-zero recycle forces a second pass. Stages are left holding the
/// final pass's streams whether or not the tolerance was met.
pub fn solve(feed: &Stream, stages: &mut [Stage], config: &SolverConfig) -> SolverResult<SolverOutcome> {
    let head = stages
        .first()
        .map(|s| s.kind)
        .ok_or_else(|| SolverError::ProblemSetup {
            what: "train has no stages".to_string(),
        })?;
    let max_iterations = config.max_iterations.max(1);

    let mut recycles: Vec<RecycleStream> = Vec::new();
    let mut report = ConvergenceReport {
        iterations: 0,
        achieved: false,
        max_relative_change: 0.0,
    };

    for iteration in 1..=max_iterations {
        let adjusted = head_blend(feed, &recycles, head)?;
        chain(&adjusted, stages)?;

        let mut next = Vec::new();
        for stage in stages.iter() {
            next.extend(recycles_for(stage, head)?);
        }

        let max_change = next
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let previous = recycles.get(i).map_or(0.0, |p| p.flow_m3_per_day);
                relative_change(r.flow_m3_per_day, previous)
            })
            .fold(0.0, f64::max);

        tracing::debug!(
            iteration,
            recycles = next.len(),
            head_flow = adjusted.flow(),
            max_change,
            "recycle pass"
        );

        recycles = next;
        report = ConvergenceReport {
            iterations: iteration,
            achieved: max_change < config.tolerance,
            max_relative_change: max_change,
        };
        if report.achieved {
            break;
        }
    }

    if !report.achieved {
        tracing::warn!(
            iterations = report.iterations,
            max_change = report.max_relative_change,
            "recycle loop did not converge; returning last pass"
        );
    }

    Ok(SolverOutcome { recycles, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_stages::DefaultTables;

    fn train(kinds: &[StageKind]) -> Vec<Stage> {
        let tables = DefaultTables::standard();
        kinds
            .iter()
            .map(|k| Stage::new(*k, tables.design_for(*k)))
            .collect()
    }

    fn sewage() -> Stream {
        Stream::liquid(1_000.0)
            .unwrap()
            .with_values([(Analyte::Bod, 250.0), (Analyte::Tss, 250.0)])
            .unwrap()
    }

    #[test]
    fn no_recycles_converges_on_first_pass() {
        let mut stages = train(&[StageKind::Preliminary, StageKind::Disinfection]);
        let outcome = solve(&sewage(), &mut stages, &SolverConfig::default()).unwrap();
        assert!(outcome.report.achieved);
        assert_eq!(outcome.report.iterations, 1);
        assert!(outcome.recycles.is_empty());
    }

    #[test]
    fn nonzero_recycle_forces_second_pass() {
        let mut stages = train(&[
            StageKind::Preliminary,
            StageKind::TertiaryFiltration,
            StageKind::Disinfection,
        ]);
        let outcome = solve(&sewage(), &mut stages, &SolverConfig::default()).unwrap();
        assert!(outcome.report.achieved);
        assert!(outcome.report.iterations >= 2);
        // backwash returned to the head raises the head flow
        assert!(stages[0].influent.flow() > 1_000.0);
    }

    #[test]
    fn cap_reached_is_reported_not_raised() {
        let mut stages = train(&[
            StageKind::Preliminary,
            StageKind::PrimaryClarifier,
            StageKind::ActivatedSludge,
            StageKind::TertiaryFiltration,
            StageKind::Disinfection,
        ]);
        let config = SolverConfig {
            max_iterations: 1,
            tolerance: 0.01,
        };
        let outcome = solve(&sewage(), &mut stages, &config).unwrap();
        assert_eq!(outcome.report.iterations, 1);
        assert!(!outcome.report.achieved);
        assert!(stages.iter().all(|s| !s.effluent.is_empty_flow()));
    }

    #[test]
    fn empty_train_is_a_setup_error() {
        let mut stages: Vec<Stage> = Vec::new();
        assert!(matches!(
            solve(&sewage(), &mut stages, &SolverConfig::default()),
            Err(SolverError::ProblemSetup { .. })
        ));
    }

    #[test]
    fn config_set_by_name() {
        let mut config = SolverConfig::default();
        assert!(config.set("max_iterations", 25.0));
        assert!(config.set("tolerance", 0.001));
        assert!(!config.set("tolerance", -1.0));
        assert!(!config.set("damping", 0.5));
        assert_eq!(config.max_iterations, 25);
        assert_eq!(config.tolerance, 0.001);
    }
}
