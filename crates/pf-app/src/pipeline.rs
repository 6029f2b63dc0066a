//! Pieces shared by every variant: run configuration, topology signals,
//! train construction and single-pass routing.

use crate::error::AppResult;
use crate::result::{Ledger, Metric, Severity, put};
use pf_core::units::constants::METHANE_HHV_MJ_NM3;
use pf_project::{EngineConfig, Project};
use pf_sizing::{EquipmentItem, IdAllocator, size_train};
use pf_stages::{Stage, StageKind};
use pf_streams::{Analyte, Stream, StreamClass};
use pf_topology::{Hints, Signals, Target};
use std::collections::BTreeMap;

/// Base configuration with the project's overrides applied.
///
/// Paths that cannot be applied are reported and otherwise ignored.
pub(crate) fn run_config(project: &Project, base: &EngineConfig, ledger: &mut Ledger) -> EngineConfig {
    let (config, rejected) = base.with_overrides(&project.overrides);
    for r in rejected {
        ledger.warn(
            format!("overrides.{}", r.path),
            format!("override {} ignored: {}", r.value, r.error),
            Severity::Warning,
        );
    }
    config
}

/// Targets, keyword hints and feed facts for topology selection.
pub(crate) fn signals_for(project: &Project, ledger: &mut Ledger) -> Signals {
    let mut targets = Vec::new();
    for (i, output) in project.outputs.iter().enumerate() {
        match output.value.as_f64() {
            Some(limit) => targets.push(Target::classify(&output.name, limit, &output.unit)),
            None => ledger.warn(
                format!("outputs[{i}].value"),
                format!("target '{}' has no numeric value; ignored", output.name),
                Severity::Warning,
            ),
        }
    }

    let feed_names = project.feed_streams.iter().filter_map(|f| f.name.as_deref());
    let hints = Hints::new(
        project
            .constraints
            .iter()
            .map(String::as_str)
            .chain(project.location.as_deref())
            .chain(feed_names),
    );

    Signals {
        targets,
        hints,
        ..Signals::default()
    }
}

/// Fresh, unevaluated stages carrying their design from the configuration.
pub(crate) fn build_train(kinds: &[StageKind], config: &EngineConfig) -> Vec<Stage> {
    kinds
        .iter()
        .map(|k| Stage::new(*k, config.tables.design_for(*k)))
        .collect()
}

/// Thread streams through a train without recycles.
///
/// Each stage takes the latest stream of its own input class, so a train can
/// switch phase: digester biogas feeds gas conditioning, dewatering centrate
/// feeds liquid polishing. Gas management is fed the raw gas ahead of
/// upgrading. A stage with nothing upstream of its class is left empty.
pub(crate) fn route(feed: &Stream, stages: &mut [Stage]) -> AppResult<()> {
    let mut latest: BTreeMap<StreamClass, Stream> = BTreeMap::new();
    latest.insert(feed.class(), feed.clone());
    let mut raw_gas: Option<Stream> = None;

    for stage in stages.iter_mut() {
        let class = stage.kind.input_class();
        let input = match (stage.kind, &raw_gas) {
            (StageKind::GasManagement, Some(gas)) => {
                stage.notes.push("sized on raw gas ahead of upgrading".to_string());
                Some(gas.clone())
            }
            _ => latest.get(&class).cloned(),
        };
        let Some(input) = input else {
            stage
                .notes
                .push(format!("no upstream {class:?} stream; not evaluated"));
            continue;
        };
        if stage.kind == StageKind::GasUpgrading {
            raw_gas = Some(input.clone());
        }

        let effluent = stage.evaluate(input)?.clone();
        latest.insert(class, effluent);
        if let Some(side) = &stage.side_stream {
            // tail gas shares its class with the upgrader feed and is not routed
            if side.class() != class {
                latest.insert(side.class(), side.clone());
            }
        }
    }
    Ok(())
}

/// Equipment for a train with its own id sequence.
///
/// A stage whose criteria give non-physical equipment is reported and left
/// without equipment.
pub(crate) fn size(stages: &[Stage], ledger: &mut Ledger) -> Vec<EquipmentItem> {
    let mut ids = IdAllocator::new();
    let sizing = size_train(stages, &mut ids);
    for (index, error) in sizing.failures {
        let Some(stage) = stages.get(index) else {
            continue;
        };
        ledger.warn(
            format!("stages.{}", stage.kind.key()),
            format!("{} not sized: {error}", stage.name),
            Severity::Warning,
        );
    }
    sizing.items
}

/// Flow plus every analyte of a stream, keyed `<prefix>_<analyte>`.
pub(crate) fn put_stream(summary: &mut BTreeMap<String, Metric>, prefix: &str, stream: &Stream) {
    put(summary, format!("{prefix}_flow"), stream.flow(), stream.flow_unit().symbol());
    for (analyte, value) in stream.values() {
        put(summary, format!("{prefix}_{}", analyte.key()), value, analyte.unit());
    }
}

/// Methane volume (Nm3/d) in a gas stream.
pub(crate) fn methane_flow(gas: &Stream) -> f64 {
    gas.flow() * gas.value_or_zero(Analyte::Methane) / 100.0
}

/// Methane flow and its higher-heating-value energy (GJ/d).
pub(crate) fn put_methane(summary: &mut BTreeMap<String, Metric>, gas: &Stream) {
    let methane = methane_flow(gas);
    put(summary, "methane", methane, "Nm3/d");
    put(summary, "methane_energy", methane * METHANE_HHV_MJ_NM3 / 1_000.0, "GJ/d");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn solids_train_switches_phase() {
        let kinds = [
            StageKind::Receiving,
            StageKind::Digestion,
            StageKind::Dewatering,
            StageKind::LiquidPolishing,
            StageKind::GasConditioning,
            StageKind::GasUpgrading,
            StageKind::GasManagement,
        ];
        let mut stages = build_train(&kinds, &config());
        let feed = Stream::solids(50_000.0)
            .unwrap()
            .with_values([(Analyte::TotalSolids, 10_000.0), (Analyte::VolatileSolids, 8_500.0)])
            .unwrap();
        route(&feed, &mut stages).unwrap();

        let biogas = stages[1].side_stream.clone().unwrap();
        assert_eq!(stages[4].influent, biogas);
        assert_eq!(stages[3].influent.class(), StreamClass::Liquid);
        assert!(!stages[3].influent.is_empty_flow());
        // management sees the raw gas, not the upgraded product
        assert_eq!(stages[6].influent, stages[5].influent);
    }

    #[test]
    fn stage_without_upstream_is_left_empty() {
        let mut stages = build_train(&[StageKind::Receiving, StageKind::GasConditioning], &config());
        let feed = Stream::solids(1_000.0).unwrap();
        route(&feed, &mut stages).unwrap();
        assert!(stages[1].influent.is_empty_flow());
        assert_eq!(stages[1].notes.len(), 1);
        let mut ledger = Ledger::default();
        assert!(size(&stages[1..], &mut ledger).is_empty());
        assert!(ledger.warnings.is_empty());
    }

    #[test]
    fn unsizable_stage_becomes_a_warning() {
        let mut stages = build_train(
            &[StageKind::Preliminary, StageKind::PrimaryClarifier],
            &config(),
        );
        let feed = Stream::liquid(4_000.0)
            .unwrap()
            .with_values([(Analyte::Bod, 250.0), (Analyte::Tss, 240.0)])
            .unwrap();
        route(&feed, &mut stages).unwrap();
        assert!(
            stages[1]
                .criteria
                .set_value(pf_stages::Criterion::SurfaceOverflowRate, 0.0)
        );

        let mut ledger = Ledger::default();
        let items = size(&stages, &mut ledger);
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| !i.id.starts_with("PC")));
        assert_eq!(ledger.warnings.len(), 1);
        assert_eq!(ledger.warnings[0].field, "stages.primary_clarifier");
    }

    #[test]
    fn rejected_overrides_become_warnings() {
        let mut project = Project::new("p");
        project.overrides.insert("reactor.volume".into(), 3.0);
        project.overrides.insert("primary_clarifier.surface_overflow_rate".into(), 0.0);
        project.overrides.insert("digestion.hydraulic_retention_time".into(), 25.0);
        let mut ledger = Ledger::default();
        let config = run_config(&project, &EngineConfig::default(), &mut ledger);
        let fields: Vec<&str> = ledger.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "overrides.primary_clarifier.surface_overflow_rate",
                "overrides.reactor.volume"
            ]
        );
        assert!(ledger.warnings.iter().all(|w| w.severity == Severity::Warning));
        let digestion = config.tables.design_for(StageKind::Digestion);
        assert_eq!(
            digestion
                .criteria
                .get(pf_stages::Criterion::HydraulicRetentionTime)
                .unwrap()
                .value,
            25.0
        );
    }
}
