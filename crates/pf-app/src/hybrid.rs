//! Hybrid variant: liquid train whose sludge, together with any trucked-in
//! feedstock, feeds a solids-to-gas pipeline.

use crate::error::AppResult;
use crate::feed::interpret_feeds;
use crate::liquid::{LiquidRun, converge_liquid, liquid_summary};
use crate::pipeline::{run_config, size};
use crate::result::{Ledger, Metric, Severity, SimulationResult, Variant, put};
use crate::solids::{digest_feeds, solids_summary};
use pf_project::{EngineConfig, FeedKind, Project};
use pf_sizing::EquipmentItem;
use pf_solver::RecycleStream;
use pf_stages::{Stage, StageKind};
use pf_streams::{Analyte, Stream};
use std::collections::BTreeMap;

/// Weight on suspended solids settled in primary treatment.
const SETTLED_TSS_WEIGHT: f64 = 0.6;
/// Weight on biomass grown from BOD removed in secondary treatment.
const BIOMASS_WEIGHT: f64 = 0.4;
/// kg TSS grown per kg BOD removed.
const BIOMASS_YIELD: f64 = 0.6;
const SLUDGE_VS_FRACTION: f64 = 0.75;
/// Thickened sludge solids content (%).
const SLUDGE_SOLIDS_PCT: f64 = 4.0;
const SLUDGE_CN: f64 = 9.0;
const CALIBRATION_SOURCE: &str = "sludge estimate calibration, uncited; replace with site data";

const LIQUID: &str = "liquid";
const SOLIDS: &str = "solids";

/// Dry and volatile sludge production (kg/d) implied by the liquid train's removals.
pub(crate) fn sludge_estimate(stages: &[Stage]) -> (f64, f64) {
    let settled_tss: f64 = stages
        .iter()
        .filter(|s| {
            matches!(
                s.kind,
                StageKind::PrimaryClarifier | StageKind::DissolvedAirFlotation
            )
        })
        .map(|s| s.removed_load(Analyte::Tss))
        .sum();
    let removed_bod: f64 = stages
        .iter()
        .filter(|s| s.kind.is_secondary())
        .map(|s| s.removed_load(Analyte::Bod))
        .sum();
    let ts = SETTLED_TSS_WEIGHT * settled_tss + BIOMASS_WEIGHT * removed_bod * BIOMASS_YIELD;
    (ts, ts * SLUDGE_VS_FRACTION)
}

fn sludge_stream(liquid: &LiquidRun, ledger: &mut Ledger) -> AppResult<Option<Stream>> {
    let (ts, vs) = sludge_estimate(&liquid.stages);
    ledger.assume("sludge.tss_weight", SETTLED_TSS_WEIGHT, "-", CALIBRATION_SOURCE);
    ledger.assume("sludge.biomass_weight", BIOMASS_WEIGHT, "-", CALIBRATION_SOURCE);
    ledger.assume("sludge.biomass_yield", BIOMASS_YIELD, "kg TSS/kg BOD", CALIBRATION_SOURCE);
    ledger.assume("sludge.vs_fraction", SLUDGE_VS_FRACTION, "-", CALIBRATION_SOURCE);
    ledger.assume("sludge.solids_content", SLUDGE_SOLIDS_PCT, "%", CALIBRATION_SOURCE);
    ledger.assume("sludge.carbon_nitrogen_ratio", SLUDGE_CN, "-", "typical municipal sludge");
    if ts <= 0.0 {
        ledger.warn("sludge", "liquid train produced no sludge", Severity::Info);
        return Ok(None);
    }
    let wet = ts * 100.0 / SLUDGE_SOLIDS_PCT;
    let stream = Stream::solids(wet)?.with_values([
        (Analyte::TotalSolids, ts),
        (Analyte::VolatileSolids, vs),
        (Analyte::CarbonNitrogenRatio, SLUDGE_CN),
    ])?;
    Ok(Some(stream))
}

/// Dewatering centrate reported against the liquid head.
fn centrate_return(stages: &[Stage], head: StageKind) -> Option<RecycleStream> {
    let dewatering = stages.iter().find(|s| s.kind == StageKind::Dewatering)?;
    let centrate = dewatering.side_stream.as_ref()?;
    let loads = centrate
        .values()
        .filter_map(|(a, _)| centrate.load_kg_per_day(a).map(|l| (a, l)))
        .collect();
    Some(RecycleStream {
        name: "Digester centrate".to_string(),
        source: StageKind::Dewatering,
        destination: head,
        flow_m3_per_day: centrate.flow(),
        loads_kg_per_day: loads,
    })
}

fn tag(prefix: &str, text: &str) -> String {
    format!("{prefix}:{text}")
}

fn tag_stages(prefix: &str, stages: &mut [Stage]) {
    for s in stages {
        s.name = tag(prefix, &s.name);
    }
}

fn tag_equipment(prefix: &str, items: &mut [EquipmentItem]) {
    for e in items {
        e.id = tag(prefix, &e.id);
        e.process = tag(prefix, &e.process);
    }
}

fn tag_ledger(prefix: &str, ledger: &mut Ledger) {
    for a in &mut ledger.assumptions {
        a.parameter = tag(prefix, &a.parameter);
    }
    for w in &mut ledger.warnings {
        w.field = tag(prefix, &w.field);
    }
}

fn merge_summary(into: &mut BTreeMap<String, Metric>, prefix: &str, from: BTreeMap<String, Metric>) {
    into.extend(from.into_iter().map(|(k, m)| (format!("{prefix}.{k}"), m)));
}

/// Simulate a treatment plant with co-digestion of its own sludge.
pub fn run_hybrid(project: &Project, config: &EngineConfig) -> AppResult<SimulationResult> {
    let mut shared = Ledger::default();
    let config = run_config(project, config, &mut shared);

    let mut liquid_ledger = Ledger::default();
    let Some(liquid) = converge_liquid(project, &config, &mut liquid_ledger)? else {
        tag_ledger(LIQUID, &mut liquid_ledger);
        shared.assumptions.append(&mut liquid_ledger.assumptions);
        shared.warnings.append(&mut liquid_ledger.warnings);
        return Ok(SimulationResult::empty(Variant::Hybrid, shared));
    };
    let mut liquid_equipment = size(&liquid.stages, &mut liquid_ledger);

    let mut solids_ledger = Ledger::default();
    let sludge = sludge_stream(&liquid, &mut solids_ledger)?;
    let trucked = interpret_feeds(project, FeedKind::Solids, &mut solids_ledger);
    let mut feeds = trucked.clone();
    feeds.extend(sludge.clone());
    let solids = digest_feeds(&feeds, project, &config, &mut solids_ledger)?;

    let mut summary = BTreeMap::new();
    merge_summary(&mut summary, LIQUID, liquid_summary(&liquid));
    if let Some(s) = &sludge {
        put(&mut summary, "sludge_ts", s.value_or_zero(Analyte::TotalSolids), "kg/d");
        put(&mut summary, "sludge_vs", s.value_or_zero(Analyte::VolatileSolids), "kg/d");
        put(&mut summary, "sludge_wet_mass", s.flow(), "kg/d");
    }
    let trucked_vs: f64 = trucked.iter().map(|s| s.value_or_zero(Analyte::VolatileSolids)).sum();
    put(&mut summary, "trucked_vs", trucked_vs, "kg/d");

    let head = liquid.stages.first().map_or(StageKind::Preliminary, |s| s.kind);
    let mut recycles = liquid.recycles;
    let mut stages = liquid.stages;
    tag_stages(LIQUID, &mut stages);
    tag_equipment(LIQUID, &mut liquid_equipment);
    let mut equipment = liquid_equipment;

    if let Some(mut run) = solids {
        merge_summary(&mut summary, SOLIDS, solids_summary(&run));
        if let Some(centrate) = centrate_return(&run.stages, head) {
            solids_ledger.warn(
                "centrate",
                format!(
                    "{:.1} m3/d of centrate returns to the liquid head; reported, not re-converged",
                    centrate.flow_m3_per_day
                ),
                Severity::Info,
            );
            recycles.push(centrate);
        }
        tag_stages(SOLIDS, &mut run.stages);
        tag_equipment(SOLIDS, &mut run.equipment);
        stages.extend(run.stages);
        equipment.extend(run.equipment);
    }

    tag_ledger(LIQUID, &mut liquid_ledger);
    tag_ledger(SOLIDS, &mut solids_ledger);
    let mut ledger = shared;
    for mut part in [liquid_ledger, solids_ledger] {
        ledger.assumptions.append(&mut part.assumptions);
        ledger.warnings.append(&mut part.warnings);
    }

    tracing::info!(
        project = %project.name,
        stages = stages.len(),
        equipment = equipment.len(),
        sludge_ts = sludge.as_ref().map_or(0.0, |s| s.value_or_zero(Analyte::TotalSolids)),
        "hybrid run complete"
    );

    Ok(SimulationResult {
        variant: Variant::Hybrid,
        stages,
        recycle_streams: recycles,
        equipment,
        convergence: liquid.report,
        assumptions: ledger.assumptions,
        warnings: ledger.warnings,
        summary,
    })
}
