//! Recycle streams implied by each stage kind.

use crate::error::SolverResult;
use pf_core::units::constants::WATER_DENSITY_KG_M3;
use pf_stages::{Criterion, Stage, StageKind};
use pf_streams::{Analyte, Stream};
use serde::Serialize;
use std::collections::BTreeMap;

/// Share of waste-sludge volume returned as thickening filtrate.
const THICKENING_FILTRATE_FRACTION: f64 = 0.9;
/// Solids escaping the thickener into its filtrate.
const THICKENING_SOLIDS_LOSS: f64 = 0.05;
/// Share of DAF float volume drained back as subnatant.
const FLOAT_SUBNATANT_FRACTION: f64 = 0.25;
/// Float solids carried back in the subnatant.
const FLOAT_SOLIDS_LOSS: f64 = 0.10;

/// An internal stream from a downstream stage back to an upstream point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecycleStream {
    pub name: String,
    pub source: StageKind,
    pub destination: StageKind,
    pub flow_m3_per_day: f64,
    pub loads_kg_per_day: BTreeMap<Analyte, f64>,
}

impl RecycleStream {
    fn new(name: &str, source: StageKind, destination: StageKind, flow: f64) -> Self {
        Self {
            name: name.to_string(),
            source,
            destination,
            flow_m3_per_day: flow.max(0.0),
            loads_kg_per_day: BTreeMap::new(),
        }
    }

    fn with_load(mut self, analyte: Analyte, kg_per_day: f64) -> Self {
        if kg_per_day > 0.0 {
            self.loads_kg_per_day.insert(analyte, kg_per_day);
        }
        self
    }

    /// Carries the composition of `stream` at the recycle flow.
    fn carrying(mut self, stream: &Stream) -> Self {
        for (analyte, value) in stream.values() {
            let load = value * self.flow_m3_per_day / 1_000.0;
            self = self.with_load(analyte, load);
        }
        self
    }
}

/// Recycles implied by a converged (or partially converged) stage.
///
/// `head` is the first stage of the train; only recycles with that
/// destination are blended back into the feed.
pub fn recycles_for(stage: &Stage, head: StageKind) -> SolverResult<Vec<RecycleStream>> {
    let kind = stage.kind;
    let q = stage.influent.flow();
    let ratio = || stage.criteria.value(kind, Criterion::RecycleRatio);

    let out = match kind {
        StageKind::ActivatedSludge | StageKind::MembraneBioreactor => {
            let r = ratio()?;
            let mlss = stage
                .criteria
                .value(kind, Criterion::MixedLiquorSuspendedSolids)?;
            let yield_factor = stage.criteria.value(kind, Criterion::ObservedYield)?;
            let internal_name = if kind == StageKind::ActivatedSludge {
                "Return activated sludge"
            } else {
                "Mixed liquor recirculation"
            };
            // return stream concentrated so the reactor holds MLSS
            let return_conc = if r > 0.0 { mlss * (1.0 + r) / r } else { mlss };
            let internal = RecycleStream::new(internal_name, kind, kind, q * r)
                .with_load(Analyte::Tss, q * r * return_conc / 1_000.0);

            let waste_solids = stage.removed_load(Analyte::Bod) * yield_factor;
            let waste_m3 = if return_conc > 0.0 {
                waste_solids * 1_000.0 / return_conc
            } else {
                0.0
            };
            let filtrate = RecycleStream::new(
                "Waste sludge thickening filtrate",
                kind,
                head,
                waste_m3 * THICKENING_FILTRATE_FRACTION,
            )
            .with_load(Analyte::Tss, waste_solids * THICKENING_SOLIDS_LOSS);
            vec![internal, filtrate]
        }
        StageKind::TricklingFilter => {
            let flow = q * ratio()?;
            vec![RecycleStream::new("Filter recirculation", kind, kind, flow).carrying(&stage.effluent)]
        }
        StageKind::Denitrification => {
            let flow = q * ratio()?;
            vec![RecycleStream::new("Internal nitrate recycle", kind, kind, flow).carrying(&stage.effluent)]
        }
        StageKind::DissolvedAirFlotation => {
            let pressurised = RecycleStream::new("Pressurised recycle", kind, kind, q * ratio()?)
                .carrying(&stage.effluent);
            let float_pct = stage.criteria.value(kind, Criterion::SludgeSolidsContent)?;
            let float_solids = stage.removed_load(Analyte::Tss) + stage.removed_load(Analyte::Fog);
            let float_m3 = if float_pct > 0.0 {
                float_solids / (float_pct / 100.0) / WATER_DENSITY_KG_M3
            } else {
                0.0
            };
            let subnatant = RecycleStream::new(
                "Float subnatant",
                kind,
                head,
                float_m3 * FLOAT_SUBNATANT_FRACTION,
            )
            .with_load(Analyte::Tss, float_solids * FLOAT_SOLIDS_LOSS);
            vec![pressurised, subnatant]
        }
        StageKind::TertiaryFiltration => {
            let fraction = stage.criteria.value(kind, Criterion::BackwashFraction)?;
            let backwash = RecycleStream::new("Filter backwash", kind, head, q * fraction)
                .with_load(Analyte::Tss, stage.removed_load(Analyte::Tss))
                .with_load(Analyte::Bod, stage.removed_load(Analyte::Bod))
                .with_load(Analyte::TotalPhosphorus, stage.removed_load(Analyte::TotalPhosphorus));
            vec![backwash]
        }
        _ => Vec::new(),
    };
    Ok(out)
}
