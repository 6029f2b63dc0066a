//! Solids-to-gas variant: blend feedstocks, digest, dewater, upgrade.
//!
//! The pipeline has no backflow to its head, so one pass in process order is
//! the converged state.

use crate::error::AppResult;
use crate::feed::interpret_feeds;
use crate::pipeline::{build_train, put_methane, route, run_config, signals_for, size};
use crate::result::{Ledger, Metric, Severity, SimulationResult, Variant, put, single_pass};
use pf_project::{EngineConfig, FeedKind, Project};
use pf_sizing::EquipmentItem;
use pf_stages::{Stage, StageKind, Thresholds};
use pf_streams::{Analyte, Stream, blend};
use pf_topology::{TrainKind, select};
use std::collections::BTreeMap;

/// Sized solids pipeline.
pub(crate) struct SolidsRun {
    pub stages: Vec<Stage>,
    pub equipment: Vec<EquipmentItem>,
}

/// Run the pipeline on already-interpreted feeds; `None` when there are none.
pub(crate) fn digest_feeds(
    feeds: &[Stream],
    project: &Project,
    config: &EngineConfig,
    ledger: &mut Ledger,
) -> AppResult<Option<SolidsRun>> {
    if feeds.is_empty() {
        ledger.warn("feed_streams", "no usable solids feed stream", Severity::Error);
        return Ok(None);
    }
    let feed = blend(feeds)?;
    check_plausibility(&feed, &config.thresholds, ledger);

    let mut signals = signals_for(project, ledger);
    signals.feed_solids_pct = feed.solids_content_pct();
    let kinds = select(TrainKind::Solids, &signals, &config.thresholds);

    let mut stages = build_train(&kinds, config);
    route(&feed, &mut stages)?;
    let equipment = size(&stages, ledger);
    Ok(Some(SolidsRun { stages, equipment }))
}

fn check_plausibility(feed: &Stream, thresholds: &Thresholds, ledger: &mut Ledger) {
    if let Some(cn) = feed.value(Analyte::CarbonNitrogenRatio) {
        if cn < thresholds.cn_ratio_min {
            ledger.warn(
                "feed_streams",
                format!(
                    "blended C:N of {cn:.1} is below {}; ammonia inhibition is likely",
                    thresholds.cn_ratio_min
                ),
                Severity::Warning,
            );
        } else if cn > thresholds.cn_ratio_max {
            ledger.warn(
                "feed_streams",
                format!(
                    "blended C:N of {cn:.1} is above {}; digestion may be nitrogen limited",
                    thresholds.cn_ratio_max
                ),
                Severity::Warning,
            );
        }
    }
    let ts = feed.value_or_zero(Analyte::TotalSolids);
    if feed.value_or_zero(Analyte::VolatileSolids) > ts + 1e-9 {
        ledger.warn(
            "feed_streams",
            "volatile solids exceed total solids",
            Severity::Warning,
        );
    }
}

fn find(stages: &[Stage], kind: StageKind) -> Option<&Stage> {
    stages.iter().find(|s| s.kind == kind)
}

pub(crate) fn solids_summary(run: &SolidsRun) -> BTreeMap<String, Metric> {
    let mut summary = BTreeMap::new();
    if let Some(head) = run.stages.first() {
        put(&mut summary, "feed_wet_mass", head.influent.flow(), "kg/d");
        put(&mut summary, "ts_load", head.influent.value_or_zero(Analyte::TotalSolids), "kg/d");
        put(&mut summary, "vs_load", head.influent.value_or_zero(Analyte::VolatileSolids), "kg/d");
    }
    if let Some(biogas) = find(&run.stages, StageKind::Digestion).and_then(|s| s.side_stream.as_ref()) {
        put(&mut summary, "biogas", biogas.flow(), "Nm3/d");
        put_methane(&mut summary, biogas);
    }
    if let Some(cake) = find(&run.stages, StageKind::Dewatering) {
        put(&mut summary, "cake", cake.effluent.flow(), "kg/d");
    }
    if let Some(upgrader) = find(&run.stages, StageKind::GasUpgrading) {
        put(&mut summary, "rng_product", upgrader.effluent.flow(), "Nm3/d");
    }
    let digester_volume: f64 = run
        .equipment
        .iter()
        .filter(|e| e.equipment_type == "Anaerobic digester")
        .filter_map(|e| e.spec_value("total_volume"))
        .sum();
    if digester_volume > 0.0 {
        put(&mut summary, "digester_volume", digester_volume, "m3");
    }
    summary
}

/// Simulate a solids-to-gas facility from its declared feedstocks.
pub fn run_solids_to_gas(project: &Project, config: &EngineConfig) -> AppResult<SimulationResult> {
    let mut ledger = Ledger::default();
    let config = run_config(project, config, &mut ledger);
    let feeds = interpret_feeds(project, FeedKind::Solids, &mut ledger);
    let Some(run) = digest_feeds(&feeds, project, &config, &mut ledger)? else {
        return Ok(SimulationResult::empty(Variant::SolidsToGas, ledger));
    };

    let summary = solids_summary(&run);
    tracing::info!(
        project = %project.name,
        feeds = feeds.len(),
        stages = run.stages.len(),
        equipment = run.equipment.len(),
        "solids-to-gas run complete"
    );

    Ok(SimulationResult {
        variant: Variant::SolidsToGas,
        stages: run.stages,
        recycle_streams: Vec::new(),
        equipment: run.equipment,
        convergence: single_pass(),
        assumptions: ledger.assumptions,
        warnings: ledger.warnings,
        summary,
    })
}
