//! Liquid-only variant: select, converge, size.

use crate::error::AppResult;
use crate::feed::interpret_feeds;
use crate::pipeline::{build_train, put_stream, run_config, signals_for, size};
use crate::result::{Ledger, Metric, Severity, SimulationResult, Variant, put};
use pf_project::{EngineConfig, FeedKind, Project};
use pf_solver::{ConvergenceReport, RecycleStream, solve};
use pf_stages::Stage;
use pf_streams::{Analyte, Stream, blend};
use pf_topology::{TrainKind, select};
use std::collections::BTreeMap;

/// Converged liquid train before sizing.
pub(crate) struct LiquidRun {
    pub feed: Stream,
    pub stages: Vec<Stage>,
    pub recycles: Vec<RecycleStream>,
    pub report: ConvergenceReport,
}

impl LiquidRun {
    pub fn effluent(&self) -> &Stream {
        self.stages.last().map_or(&self.feed, |s| &s.effluent)
    }
}

/// Run the liquid train; `None` when no usable liquid feed exists.
pub(crate) fn converge_liquid(
    project: &Project,
    config: &EngineConfig,
    ledger: &mut Ledger,
) -> AppResult<Option<LiquidRun>> {
    let feeds = interpret_feeds(project, FeedKind::Liquid, ledger);
    if feeds.is_empty() {
        ledger.warn("feed_streams", "no usable liquid feed stream", Severity::Error);
        return Ok(None);
    }
    let feed = blend(&feeds)?;

    let mut signals = signals_for(project, ledger);
    signals.feed_fog_mg_l = feed.value(Analyte::Fog);
    let kinds = select(TrainKind::Liquid, &signals, &config.thresholds);

    let mut stages = build_train(&kinds, config);
    let outcome = solve(&feed, &mut stages, &config.solver)?;
    if !outcome.report.achieved {
        ledger.warn(
            "convergence",
            format!(
                "recycle loop did not converge in {} iterations (last change {:.4}); final pass reported",
                outcome.report.iterations, outcome.report.max_relative_change
            ),
            Severity::Warning,
        );
    }

    let run = LiquidRun {
        feed,
        stages,
        recycles: outcome.recycles,
        report: outcome.report,
    };
    check_targets(project, run.effluent(), ledger);
    Ok(Some(run))
}

/// Warn for every concentration target the final effluent exceeds.
fn check_targets(project: &Project, effluent: &Stream, ledger: &mut Ledger) {
    for (i, output) in project.outputs.iter().enumerate() {
        let Some(limit) = output.value.as_f64() else {
            continue;
        };
        let target = pf_topology::Target::classify(&output.name, limit, &output.unit);
        if !target.is_concentration() {
            continue;
        }
        let Some(value) = target.analyte.and_then(|a| effluent.value(a)) else {
            continue;
        };
        if value > limit {
            ledger.warn(
                format!("outputs[{i}]"),
                format!(
                    "effluent {} {value:.2} mg/L exceeds the target of {limit} {}",
                    output.name, output.unit
                ),
                Severity::Warning,
            );
        }
    }
}

pub(crate) fn liquid_summary(run: &LiquidRun) -> BTreeMap<String, Metric> {
    let mut summary = BTreeMap::new();
    put_stream(&mut summary, "influent", &run.feed);
    put_stream(&mut summary, "effluent", run.effluent());
    let recycle_flow: f64 = run.recycles.iter().map(|r| r.flow_m3_per_day).sum();
    put(&mut summary, "total_recycle_flow", recycle_flow, "m3/d");
    summary
}

/// Simulate a liquid treatment train.
pub fn run_liquid(project: &Project, config: &EngineConfig) -> AppResult<SimulationResult> {
    let mut ledger = Ledger::default();
    let config = run_config(project, config, &mut ledger);
    let Some(run) = converge_liquid(project, &config, &mut ledger)? else {
        return Ok(SimulationResult::empty(Variant::Liquid, ledger));
    };

    let equipment = size(&run.stages, &mut ledger);
    let summary = liquid_summary(&run);
    tracing::info!(
        project = %project.name,
        stages = run.stages.len(),
        equipment = equipment.len(),
        iterations = run.report.iterations,
        converged = run.report.achieved,
        "liquid run complete"
    );

    Ok(SimulationResult {
        variant: Variant::Liquid,
        stages: run.stages,
        recycle_streams: run.recycles,
        equipment,
        convergence: run.report,
        assumptions: ledger.assumptions,
        warnings: ledger.warnings,
        summary,
    })
}
