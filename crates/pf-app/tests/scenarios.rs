use pf_app::*;
use pf_project::{EngineConfig, FeedKind, FeedStreamDef, OutputTargetDef, Project, RawValue, parse_yaml};
use pf_stages::{Criterion, StageKind};
use pf_streams::Analyte;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn liquid_project(flow: f64) -> Project {
    let mut project = Project::new("Municipal plant");
    project.feed_streams.push(FeedStreamDef {
        name: None,
        kind: FeedKind::Liquid,
        flow: RawValue::Number(flow),
        flow_unit: "m3/d".to_string(),
        specs: BTreeMap::new(),
    });
    project
}

fn target(name: &str, value: f64) -> OutputTargetDef {
    OutputTargetDef {
        name: name.to_string(),
        value: RawValue::Number(value),
        unit: "mg/L".to_string(),
        group: None,
    }
}

fn kinds(result: &SimulationResult) -> Vec<StageKind> {
    result.stages.iter().map(|s| s.kind).collect()
}

#[test]
fn default_liquid_train() {
    let result = run_liquid(&liquid_project(1.0), &EngineConfig::default()).unwrap();
    assert_eq!(
        kinds(&result),
        vec![
            StageKind::Preliminary,
            StageKind::Equalization,
            StageKind::PrimaryClarifier,
            StageKind::ActivatedSludge,
            StageKind::Disinfection,
        ]
    );
    let bod_in = result.stages[0].influent.value(Analyte::Bod).unwrap();
    let bod_out = result.stages.last().unwrap().effluent.value(Analyte::Bod).unwrap();
    assert!(bod_out < bod_in);
    assert!(!result.equipment.is_empty());
    assert!(!result.recycle_streams.is_empty());
    assert!(result.assumptions.iter().any(|a| a.parameter == "feed_streams[0].bod"));
    assert!(!result.has_errors());
}

#[test]
fn strict_nitrogen_adds_nitrification_and_denitrification() {
    let mut project = liquid_project(1.0);
    project.outputs.push(target("TKN", 5.0));
    let result = run_liquid(&project, &EngineConfig::default()).unwrap();
    let order = kinds(&result);

    let pos = |k: StageKind| order.iter().position(|x| *x == k).unwrap();
    let secondary = pos(StageKind::ActivatedSludge);
    let nit = pos(StageKind::Nitrification);
    let denit = pos(StageKind::Denitrification);
    let disinfection = pos(StageKind::Disinfection);
    assert!(secondary < nit && nit < denit && denit < disinfection);
}

#[test]
fn exceeded_target_is_a_warning_on_the_output() {
    let mut project = liquid_project(5_000.0);
    project.outputs.push(target("BOD", 0.01));
    let result = run_liquid(&project, &EngineConfig::default()).unwrap();
    let w = result
        .warnings
        .iter()
        .find(|w| w.field == "outputs[0]")
        .unwrap();
    assert_eq!(w.severity, Severity::Warning);
    assert!(!result.stages.is_empty());
}

#[test]
fn gas_only_with_garbage_flow_returns_empty_result() {
    let project = parse_yaml(
        r#"
name: Landfill gas
feed_streams:
  - kind: biogas
    flow: "to be confirmed by operator"
"#,
    )
    .unwrap();
    let result = simulate(Variant::GasOnly, &project, &EngineConfig::default()).unwrap();
    assert!(result.stages.is_empty());
    assert!(result.equipment.is_empty());
    let w = result
        .warnings
        .iter()
        .find(|w| w.severity == Severity::Error)
        .unwrap();
    assert_eq!(w.field, "feed_streams[0].flow");
}

const DAIRY_BIOGAS: &str = r#"
name: Dairy biogas
feed_streams:
  - kind: gas
    flow: "400 scfm"
    specs:
      CH4: { value: 62, unit: "%" }
      CO2: { value: 37, unit: "%" }
      H2S: { value: 2500, unit: ppmv }
"#;

#[test]
fn gas_only_sizes_the_gas_train() {
    let project = parse_yaml(DAIRY_BIOGAS).unwrap();
    let result = run_gas_only(&project, &EngineConfig::default()).unwrap();
    assert_eq!(
        kinds(&result),
        vec![StageKind::GasConditioning, StageKind::GasUpgrading, StageKind::GasManagement]
    );
    assert!(result.metric("rng_product").unwrap() > 0.0);
    assert!(result.equipment.iter().any(|e| e.equipment_type == "Emergency flare"));
}

const CODIGESTION: &str = r#"
name: Food waste co-digestion
constraints:
  - packaged food waste from grocery stores
feed_streams:
  - name: food waste
    kind: feedstock
    flow: 60
    flow_unit: t/d
    specs:
      total solids: { value: "28 %" }
      volatile solids: { value: 88, unit: "% of TS" }
      C:N: { value: 17 }
"#;

#[test]
fn solids_pipeline_digests_and_upgrades() {
    let project = parse_yaml(CODIGESTION).unwrap();
    let result = run_solids_to_gas(&project, &EngineConfig::default()).unwrap();
    let order = kinds(&result);
    assert!(order.contains(&StageKind::Depackaging));
    assert!(order.contains(&StageKind::Dilution));
    assert!(result.metric("biogas").unwrap() > 0.0);
    assert!(result.metric("digester_volume").unwrap() > 0.0);
    assert!(result.metric("rng_product").unwrap() < result.metric("biogas").unwrap());
    assert!(result.convergence.achieved);
    assert!(!result.warnings.iter().any(|w| w.message.contains("C:N")));
}

#[test]
fn low_carbon_to_nitrogen_feed_is_flagged() {
    let project = parse_yaml(
        r#"
name: Manure digester
feed_streams:
  - kind: sludge
    flow: 100
    flow_unit: t/d
    specs:
      C:N: { value: 8 }
"#,
    )
    .unwrap();
    let result = run_solids_to_gas(&project, &EngineConfig::default()).unwrap();
    let w = result
        .warnings
        .iter()
        .find(|w| w.message.contains("C:N"))
        .unwrap();
    assert_eq!(w.severity, Severity::Warning);
    assert!(!result.equipment.is_empty());
}

#[test]
fn hybrid_digests_sludge_plus_trucked_feed() {
    let mut project = liquid_project(20_000.0);
    project.name = "Plant with co-digestion".into();
    project.feed_streams.push(FeedStreamDef {
        name: Some("trucked FOG".into()),
        kind: FeedKind::Solids,
        flow: RawValue::from("15 t/d"),
        flow_unit: String::new(),
        specs: [(
            "VS".to_string(),
            pf_project::SpecDef {
                value: RawValue::Number(2_000.0),
                unit: "kg/d".to_string(),
                source: None,
            },
        )]
        .into_iter()
        .collect(),
    });

    let result = run_hybrid(&project, &EngineConfig::default()).unwrap();
    let receiving = result.stage(StageKind::Receiving).unwrap();
    let sludge_vs = result.metric("sludge_vs").unwrap();
    let digested_vs = receiving.influent.value(Analyte::VolatileSolids).unwrap();
    assert!((digested_vs - (sludge_vs + 2_000.0)).abs() < 1e-2);

    assert!(receiving.name.starts_with("solids:"));
    assert!(result.stages[0].name.starts_with("liquid:"));
    assert!(result.equipment.iter().all(|e| e.id.starts_with("liquid:") || e.id.starts_with("solids:")));
    assert!(result.recycle_streams.iter().any(|r| r.source == StageKind::Dewatering));
    assert!(result.metric("liquid.effluent_flow").is_some());
    assert!(result.metric("solids.biogas").unwrap() > 0.0);
    assert!(result.assumptions.iter().any(|a| a.parameter == "solids:sludge.tss_weight"));
}

#[test]
fn overrides_apply_and_unknown_paths_warn() {
    let mut project = liquid_project(2_000.0);
    project.outputs.push(target("NH3-N", 20.0));
    project.overrides.insert("thresholds.nitrification_mg_l".into(), 25.0);
    project.overrides.insert("clarifier.colour".into(), 1.0);
    let result = run_liquid(&project, &EngineConfig::default()).unwrap();
    assert!(kinds(&result).contains(&StageKind::Nitrification));
    let w = result
        .warnings
        .iter()
        .find(|w| w.field == "overrides.clarifier.colour")
        .unwrap();
    assert_eq!(w.severity, Severity::Warning);
}

fn project_for(variant: Variant) -> Project {
    match variant {
        Variant::Liquid => liquid_project(4_000.0),
        Variant::SolidsToGas => parse_yaml(CODIGESTION).unwrap(),
        Variant::GasOnly => parse_yaml(DAIRY_BIOGAS).unwrap(),
        Variant::Hybrid => liquid_project(20_000.0),
    }
}

fn assert_physical_equipment(result: &SimulationResult) {
    assert!(!result.equipment.is_empty());
    for item in &result.equipment {
        for (name, spec) in &item.specs {
            assert!(spec.value.is_finite() && spec.value >= 0.0, "{} {name}", item.id);
        }
    }
}

#[test]
fn non_physical_overrides_are_warnings_in_every_variant() {
    let cases = [
        (Variant::Liquid, "primary_clarifier.surface_overflow_rate", 0.0),
        (Variant::Liquid, "primary_clarifier.surface_overflow_rate", -40.0),
        (Variant::Liquid, "activated_sludge.side_water_depth", -1.0),
        (Variant::SolidsToGas, "digestion.hydraulic_retention_time", -25.0),
        (Variant::GasOnly, "gas_upgrading.upgrader_unit_capacity", 0.0),
        (Variant::Hybrid, "dewatering.cake_solids_content", 0.0),
    ];
    for (variant, path, value) in cases {
        let mut project = project_for(variant);
        project.overrides.insert(path.to_string(), value);
        let result = simulate(variant, &project, &EngineConfig::default()).unwrap();

        let field = format!("overrides.{path}");
        let w = result
            .warnings
            .iter()
            .find(|w| w.field == field)
            .unwrap_or_else(|| panic!("{variant}: no warning for {path} = {value}"));
        assert_eq!(w.severity, Severity::Warning);
        assert_physical_equipment(&result);
    }
}

#[test]
fn unsizable_calibration_is_reported_per_stage() {
    let mut config = EngineConfig::default();
    let clarifier = config
        .tables
        .criteria
        .get_mut(&StageKind::PrimaryClarifier)
        .unwrap();
    assert!(clarifier.set_value(Criterion::SurfaceOverflowRate, 0.0));

    let result = run_liquid(&liquid_project(4_000.0), &config).unwrap();
    let w = result
        .warnings
        .iter()
        .find(|w| w.field == "stages.primary_clarifier")
        .unwrap();
    assert_eq!(w.severity, Severity::Warning);
    assert!(result.equipment.iter().all(|e| !e.id.starts_with("PC")));
    assert_physical_equipment(&result);
}

#[test]
fn no_feeds_is_an_error_record_not_a_failure() {
    let project = Project::new("Empty");
    for variant in Variant::ALL {
        let result = simulate(variant, &project, &EngineConfig::default()).unwrap();
        assert!(result.has_errors(), "{variant}");
        assert!(result.stages.is_empty());
    }
}

#[test]
fn result_serializes_to_json() {
    let result = run_liquid(&liquid_project(3_000.0), &EngineConfig::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["variant"], "liquid");
    assert!(json["equipment"].as_array().unwrap().len() > 3);
    assert_eq!(json["summary"]["influent_flow"]["unit"], "m3/d");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn positive_flow_always_yields_stages(flow in 1.0f64..200_000.0) {
        let config = EngineConfig::default();
        let result = run_liquid(&liquid_project(flow), &config).unwrap();
        prop_assert!(!result.stages.is_empty());
        prop_assert!(result.convergence.iterations <= config.solver.max_iterations);
        prop_assert!(result.equipment.iter().all(|e| e.quantity >= 1));
    }

    #[test]
    fn selection_is_repeatable(flow in 10.0f64..50_000.0, tkn in 1.0f64..20.0) {
        let mut project = liquid_project(flow);
        project.outputs.push(target("TKN", tkn));
        let a = run_liquid(&project, &EngineConfig::default()).unwrap();
        let b = run_liquid(&project, &EngineConfig::default()).unwrap();
        prop_assert_eq!(kinds(&a), kinds(&b));
        prop_assert_eq!(a.equipment, b.equipment);
    }
}
