//! Turn declared feed records into canonical streams.
//!
//! Missing analytes get typical values recorded as assumptions; unusable
//! records become warnings instead of errors.

use crate::result::{Ledger, Severity};
use pf_core::units::constants::WATER_DENSITY_KG_M3;
use pf_project::{FeedKind, FeedStreamDef, Project, RawValue};
use pf_streams::{Analyte, FlowUnit, Measured, Stream, StreamClass, split_value_and_unit};
use std::collections::BTreeMap;

const MUNICIPAL_SOURCE: &str = "Metcalf & Eddy 5th ed., Table 3-18, medium-strength municipal";
const FEEDSTOCK_SOURCE: &str = "typical co-digestion feedstock";
const BIOGAS_SOURCE: &str = "typical digester biogas";
const POUND_KG: f64 = 0.453_592_37;

/// Defaults for liquid feeds (mg/L).
const LIQUID_DEFAULTS: &[(Analyte, f64)] = &[
    (Analyte::Bod, 250.0),
    (Analyte::Cod, 500.0),
    (Analyte::Tss, 250.0),
    (Analyte::Vss, 200.0),
    (Analyte::Tkn, 40.0),
    (Analyte::Ammonia, 25.0),
    (Analyte::TotalPhosphorus, 7.0),
];
const SOLIDS_DEFAULT_TS_PCT: f64 = 20.0;
const SOLIDS_DEFAULT_VS_OF_TS: f64 = 0.85;
const SOLIDS_DEFAULT_CN: f64 = 20.0;
const GAS_DEFAULTS: &[(Analyte, f64)] = &[
    (Analyte::Methane, 60.0),
    (Analyte::CarbonDioxide, 39.0),
    (Analyte::HydrogenSulfide, 1_500.0),
];

/// Interpret every feed of `kind`, skipping (and warning about) unusable ones.
pub fn interpret_feeds(project: &Project, kind: FeedKind, ledger: &mut Ledger) -> Vec<Stream> {
    project
        .feeds_of(kind)
        .filter_map(|(i, def)| interpret_feed(def, i, ledger))
        .collect()
}

/// Canonical stream for one feed record, or `None` with an error-severity warning.
pub fn interpret_feed(def: &FeedStreamDef, index: usize, ledger: &mut Ledger) -> Option<Stream> {
    let field = format!("feed_streams[{index}]");
    let class = def.kind.class();
    let flow = canonical_flow(def, class, &field, ledger)?;

    let mut values: BTreeMap<Analyte, f64> = BTreeMap::new();
    let mut additional: BTreeMap<String, Measured> = BTreeMap::new();
    let mut pending_vs_pct: Option<f64> = None;

    for (name, spec) in &def.specs {
        let spec_field = format!("{field}.specs.{name}");
        let Some(value) = spec.value.as_f64() else {
            ledger.warn(
                spec_field,
                format!("value '{}' is not numeric; ignored", spec.value),
                Severity::Warning,
            );
            continue;
        };
        let unit = unit_hint(&spec.unit, &spec.value);
        let Some(analyte) = Analyte::from_label(name) else {
            additional.insert(name.clone(), Measured::new(value, spec.unit.clone()));
            continue;
        };
        if analyte.class() != class {
            ledger.warn(
                spec_field,
                format!("{} does not apply to a {class:?} feed; ignored", analyte.display_name()),
                Severity::Warning,
            );
            continue;
        }
        match class {
            StreamClass::Liquid => {
                values.insert(analyte, liquid_concentration(value, &unit, flow));
            }
            StreamClass::Gas => {
                let v = if analyte == Analyte::HydrogenSulfide && unit.contains('%') {
                    value * 10_000.0
                } else {
                    value
                };
                values.insert(analyte, v);
            }
            StreamClass::Solids => match analyte {
                Analyte::TotalSolids => {
                    values.insert(analyte, solids_load(value, &unit, flow));
                }
                // VS percentages are of total solids, not wet mass
                Analyte::VolatileSolids if unit.contains('%') || (unit.is_empty() && value <= 100.0) => {
                    pending_vs_pct = Some(value)
                }
                Analyte::VolatileSolids => {
                    values.insert(analyte, solids_load(value, &unit, flow));
                }
                _ => {
                    values.insert(analyte, value);
                }
            },
        }
    }

    fill_defaults(class, flow, &field, &mut values, pending_vs_pct, ledger);

    let built = Stream::new(class, flow).and_then(|s| s.with_values(values));
    match built {
        Ok(stream) => Some(
            additional
                .into_iter()
                .fold(stream, |s, (name, m)| s.with_additional(name, m)),
        ),
        Err(e) => {
            ledger.warn(format!("{field}.specs"), e.to_string(), Severity::Error);
            None
        }
    }
}

/// The unit field, or the unit written into the value text ("22 %").
fn unit_hint(unit: &str, value: &RawValue) -> String {
    if !unit.trim().is_empty() {
        return unit.to_lowercase();
    }
    match value {
        RawValue::Text(t) if t.contains('%') => "%".to_string(),
        RawValue::Text(t) => split_value_and_unit(t)
            .map(|(_, u)| u)
            .unwrap_or_default(),
        RawValue::Number(_) => String::new(),
    }
}

fn liquid_concentration(value: f64, unit: &str, flow_m3_d: f64) -> f64 {
    if unit.contains("kg/d") {
        value * 1_000.0 / flow_m3_d
    } else if unit.contains("lb/d") {
        value * POUND_KG * 1_000.0 / flow_m3_d
    } else {
        value
    }
}

/// Solids load in kg/d. Bare numbers up to 100 and `%` values are percent of wet mass.
fn solids_load(value: f64, unit: &str, wet_kg_d: f64) -> f64 {
    if unit.contains('%') || (unit.is_empty() && value <= 100.0) {
        wet_kg_d * value / 100.0
    } else if let Some(u) = FlowUnit::parse(unit) {
        if u.class() == StreamClass::Solids {
            value * u.factor()
        } else {
            value
        }
    } else {
        value
    }
}

fn fill_defaults(
    class: StreamClass,
    flow: f64,
    field: &str,
    values: &mut BTreeMap<Analyte, f64>,
    vs_pct_of_ts: Option<f64>,
    ledger: &mut Ledger,
) {
    let mut default = |analyte: Analyte, value: f64, source: &str| {
        values.entry(analyte).or_insert_with(|| {
            ledger.assume(format!("{field}.{}", analyte.key()), value, analyte.unit(), source);
            value
        });
    };
    match class {
        StreamClass::Liquid => {
            for (a, v) in LIQUID_DEFAULTS {
                default(*a, *v, MUNICIPAL_SOURCE);
            }
        }
        StreamClass::Gas => {
            for (a, v) in GAS_DEFAULTS {
                default(*a, *v, BIOGAS_SOURCE);
            }
        }
        StreamClass::Solids => {
            default(
                Analyte::TotalSolids,
                flow * SOLIDS_DEFAULT_TS_PCT / 100.0,
                "typical feedstock total solids, 20 % of wet mass",
            );
            default(Analyte::CarbonNitrogenRatio, SOLIDS_DEFAULT_CN, FEEDSTOCK_SOURCE);
            let ts = values.get(&Analyte::TotalSolids).copied().unwrap_or(0.0);
            match vs_pct_of_ts {
                Some(pct) => {
                    values.insert(Analyte::VolatileSolids, ts * pct / 100.0);
                }
                None => {
                    values.entry(Analyte::VolatileSolids).or_insert_with(|| {
                        let vs = ts * SOLIDS_DEFAULT_VS_OF_TS;
                        ledger.assume(
                            format!("{field}.{}", Analyte::VolatileSolids.key()),
                            vs,
                            "kg/d",
                            "typical feedstock VS/TS 85 %",
                        );
                        vs
                    });
                }
            }
        }
    }
}

fn canonical_flow(def: &FeedStreamDef, class: StreamClass, field: &str, ledger: &mut Ledger) -> Option<f64> {
    let flow_field = format!("{field}.flow");
    let canonical_unit = class.canonical_unit();
    let Some(value) = def.flow.as_f64() else {
        ledger.warn(
            flow_field,
            format!("no numeric flow could be read from '{}'", def.flow),
            Severity::Error,
        );
        return None;
    };

    let unit_text = if !def.flow_unit.trim().is_empty() {
        def.flow_unit.clone()
    } else {
        match &def.flow {
            RawValue::Text(t) => split_value_and_unit(t).map(|(_, u)| u).unwrap_or_default(),
            RawValue::Number(_) => String::new(),
        }
    };

    let unit = if unit_text.trim().is_empty() {
        ledger.assume(flow_field.clone(), value, canonical_unit.symbol(), "no flow unit given");
        canonical_unit
    } else if let Some(unit) = FlowUnit::parse(&unit_text) {
        unit
    } else {
        ledger.warn(
            flow_field.clone(),
            format!("unknown flow unit '{unit_text}'; {canonical_unit} assumed"),
            Severity::Warning,
        );
        canonical_unit
    };

    let canonical = if unit.class() == class {
        value * unit.factor()
    } else if class == StreamClass::Solids && unit.class() == StreamClass::Liquid {
        ledger.assume(
            format!("{field}.density"),
            WATER_DENSITY_KG_M3,
            "kg/m3",
            "volumetric feedstock flow converted at water density",
        );
        value * unit.factor() * WATER_DENSITY_KG_M3
    } else {
        ledger.warn(
            flow_field,
            format!("{unit} is not a {class:?} flow unit"),
            Severity::Error,
        );
        return None;
    };

    if canonical > 0.0 && canonical.is_finite() {
        Some(canonical)
    } else {
        ledger.warn(flow_field, "flow must be positive", Severity::Error);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_project::SpecDef;

    fn def(kind: FeedKind, flow: RawValue, flow_unit: &str, specs: &[(&str, RawValue, &str)]) -> FeedStreamDef {
        FeedStreamDef {
            name: None,
            kind,
            flow,
            flow_unit: flow_unit.to_string(),
            specs: specs
                .iter()
                .map(|(n, v, u)| {
                    (
                        n.to_string(),
                        SpecDef {
                            value: v.clone(),
                            unit: u.to_string(),
                            source: None,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn liquid_defaults_are_recorded() {
        let mut ledger = Ledger::default();
        let d = def(FeedKind::Liquid, 4_000.0.into(), "m3/d", &[("BOD5", 300.0.into(), "mg/L")]);
        let s = interpret_feed(&d, 0, &mut ledger).unwrap();
        assert_eq!(s.value(Analyte::Bod), Some(300.0));
        assert_eq!(s.value(Analyte::Tss), Some(250.0));
        assert!(ledger.assumptions.iter().any(|a| a.parameter == "feed_streams[0].tss"));
        assert!(!ledger.assumptions.iter().any(|a| a.parameter == "feed_streams[0].bod"));
    }

    #[test]
    fn loads_become_concentrations() {
        let mut ledger = Ledger::default();
        let d = def(FeedKind::Liquid, "2 MGD".into(), "", &[("TSS", 1_000.0.into(), "kg/d")]);
        let s = interpret_feed(&d, 0, &mut ledger).unwrap();
        let flow = s.flow();
        assert!((flow - 7_570.82).abs() < 0.1);
        assert!((s.value(Analyte::Tss).unwrap() - 1_000.0 * 1_000.0 / flow).abs() < 1e-9);
    }

    #[test]
    fn garbage_flow_is_an_error_warning_naming_the_field() {
        let mut ledger = Ledger::default();
        let d = def(FeedKind::Gas, "plenty, ask operator".into(), "", &[]);
        assert!(interpret_feed(&d, 0, &mut ledger).is_none());
        let w = &ledger.warnings[0];
        assert_eq!(w.field, "feed_streams[0].flow");
        assert_eq!(w.severity, Severity::Error);
    }

    #[test]
    fn solids_percentages_become_loads() {
        let mut ledger = Ledger::default();
        let d = def(
            FeedKind::Solids,
            "50 t/d".into(),
            "",
            &[("Total Solids", "25 %".into(), ""), ("VS", 80.0.into(), "% of TS")],
        );
        let s = interpret_feed(&d, 1, &mut ledger).unwrap();
        assert_eq!(s.flow(), 50_000.0);
        assert_eq!(s.value(Analyte::TotalSolids), Some(12_500.0));
        assert_eq!(s.value(Analyte::VolatileSolids), Some(10_000.0));
        assert_eq!(s.value(Analyte::CarbonNitrogenRatio), Some(SOLIDS_DEFAULT_CN));
    }

    #[test]
    fn solids_given_in_volume_use_water_density() {
        let mut ledger = Ledger::default();
        let d = def(FeedKind::Solids, 30.0.into(), "m3/d", &[]);
        let s = interpret_feed(&d, 0, &mut ledger).unwrap();
        assert_eq!(s.flow(), 30_000.0);
        assert!(ledger.assumptions.iter().any(|a| a.parameter.ends_with("density")));
    }

    #[test]
    fn over_full_gas_analysis_is_rejected() {
        let mut ledger = Ledger::default();
        let d = def(
            FeedKind::Gas,
            500.0.into(),
            "Nm3/h",
            &[("CH4", 70.0.into(), "%"), ("CO2", 45.0.into(), "%")],
        );
        assert!(interpret_feed(&d, 0, &mut ledger).is_none());
        assert!(ledger.has_errors());
    }

    #[test]
    fn unknown_names_go_to_additional() {
        let mut ledger = Ledger::default();
        let d = def(FeedKind::Liquid, 100.0.into(), "m3/d", &[("Alkalinity", 220.0.into(), "mg/L as CaCO3")]);
        let s = interpret_feed(&d, 0, &mut ledger).unwrap();
        assert_eq!(s.additional()["Alkalinity"].value, 220.0);
    }
}
