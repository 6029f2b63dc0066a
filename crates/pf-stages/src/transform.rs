//! Stage transforms: pure functions from influent to effluent.

use crate::criteria::Criterion;
use crate::defaults::{RemovalProfile, StageDesign};
use crate::error::{StageError, StageResult};
use crate::kind::StageKind;
use pf_core::units::constants::{BIOGAS_DENSITY_KG_NM3, WATER_DENSITY_KG_M3};
use pf_streams::{Analyte, Stream};

/// Trace nitrogen and oxygen carried in raw biogas (vol %).
const BIOGAS_N2_PCT: f64 = 0.8;
const BIOGAS_O2_PCT: f64 = 0.2;
/// H2S remaining in upgraded product gas (ppmv).
const PRODUCT_H2S_PPMV: f64 = 4.0;

/// Main effluent plus an optional stream of another class.
///
/// Digestion emits biogas, dewatering emits centrate, upgrading emits tail gas.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub main: Stream,
    pub side: Option<Stream>,
}

impl StageOutput {
    fn single(main: Stream) -> Self {
        Self { main, side: None }
    }
}

/// `effluent[a] = influent[a] * (1 - e[a])` for every analyte in the profile.
///
/// Analytes absent from the profile pass through; flow is unchanged.
pub fn apply_removal(input: &Stream, profile: &RemovalProfile) -> StageResult<Stream> {
    let out = input.mapped(|analyte, value| match profile.efficiency(analyte) {
        Some(e) => value * (1.0 - e.clamp(0.0, 1.0)),
        None => value,
    })?;
    Ok(out)
}

/// Evaluate one stage kind against an influent.
pub fn transform(kind: StageKind, input: &Stream, design: &StageDesign) -> StageResult<StageOutput> {
    let expected = kind.input_class();
    if input.class() != expected {
        return Err(StageError::ClassMismatch {
            stage: kind,
            expected,
            found: input.class(),
        });
    }
    let param = |c: Criterion| design.criteria.value(kind, c);

    match kind {
        StageKind::Nitrification => nitrify(input, &design.removal).map(StageOutput::single),
        k if k.uses_removal_table() => apply_removal(input, &design.removal).map(StageOutput::single),
        StageKind::Depackaging => {
            let keep = 1.0 - param(Criterion::RejectFraction)?.clamp(0.0, 1.0);
            let out = input
                .mapped(|a, v| if a.is_solids_load() { v * keep } else { v })?
                .with_flow(input.flow() * keep)?;
            Ok(StageOutput::single(out))
        }
        StageKind::Dilution => {
            let target = param(Criterion::TargetSolidsContent)?;
            dilute(input, target).map(StageOutput::single)
        }
        StageKind::Digestion => digest(input, design),
        StageKind::Dewatering => dewater(input, design),
        StageKind::GasConditioning => {
            let eff = param(Criterion::H2sRemovalEfficiency)?.clamp(0.0, 1.0);
            let out = input.mapped(|a, v| {
                if a == Analyte::HydrogenSulfide {
                    v * (1.0 - eff)
                } else {
                    v
                }
            })?;
            Ok(StageOutput::single(out))
        }
        StageKind::GasUpgrading => upgrade(input, design),
        // receiving, preparation, feed equalization and emergency gas handling
        // hold or condition the stream without changing it
        _ => Ok(StageOutput::single(input.clone())),
    }
}

fn nitrify(input: &Stream, removal: &RemovalProfile) -> StageResult<Stream> {
    let out = apply_removal(input, removal)?;
    match (input.value(Analyte::Ammonia), out.value(Analyte::Ammonia)) {
        (Some(before), Some(after)) => {
            let nitrate = out.value_or_zero(Analyte::Nitrate) + (before - after);
            Ok(out.with_value(Analyte::Nitrate, nitrate)?)
        }
        _ => Ok(out),
    }
}

fn dilute(input: &Stream, target_pct: f64) -> StageResult<Stream> {
    let ts = input.value_or_zero(Analyte::TotalSolids);
    match input.solids_content_pct() {
        Some(pct) if target_pct > 0.0 && pct > target_pct => {
            Ok(input.with_flow(ts / (target_pct / 100.0))?)
        }
        _ => Ok(input.clone()),
    }
}

fn digest(input: &Stream, design: &StageDesign) -> StageResult<StageOutput> {
    let kind = StageKind::Digestion;
    let c = &design.criteria;
    let destruction = c.value(kind, Criterion::VolatileSolidsDestruction)?.clamp(0.0, 1.0);
    let yield_factor = c.value(kind, Criterion::BiogasYield)?;
    let methane = c.value(kind, Criterion::MethaneContent)?;
    let h2s = c.value(kind, Criterion::HydrogenSulfideContent)?;

    let ts = input.value_or_zero(Analyte::TotalSolids);
    let vs = input.value_or_zero(Analyte::VolatileSolids);
    let vs_destroyed = vs * destruction;
    let biogas_nm3 = vs_destroyed * yield_factor;
    let biogas_kg = biogas_nm3 * BIOGAS_DENSITY_KG_NM3;

    let remaining_ts = (ts - vs_destroyed).max(0.0);
    let wet = (input.flow() - biogas_kg).max(remaining_ts);
    let mut digestate = input
        .with_flow(wet)?
        .with_value(Analyte::TotalSolids, remaining_ts)?
        .with_value(Analyte::VolatileSolids, vs - vs_destroyed)?;
    digestate = digestate.without(Analyte::CarbonNitrogenRatio);

    let methane = methane.clamp(0.0, 100.0);
    let co2 = (100.0 - methane - BIOGAS_N2_PCT - BIOGAS_O2_PCT).max(0.0);
    let biogas = Stream::gas(biogas_nm3)?.with_values([
        (Analyte::Methane, methane),
        (Analyte::CarbonDioxide, co2),
        (Analyte::Nitrogen, BIOGAS_N2_PCT.min(100.0 - methane)),
        (Analyte::Oxygen, BIOGAS_O2_PCT.min((100.0 - methane - BIOGAS_N2_PCT).max(0.0))),
        (Analyte::HydrogenSulfide, h2s),
    ])?;

    Ok(StageOutput {
        main: digestate,
        side: Some(biogas),
    })
}

fn dewater(input: &Stream, design: &StageDesign) -> StageResult<StageOutput> {
    let kind = StageKind::Dewatering;
    let c = &design.criteria;
    let cake_pct = c.value(kind, Criterion::CakeSolidsContent)?;
    let capture = c.value(kind, Criterion::SolidsCapture)?.clamp(0.0, 1.0);
    let centrate_nh3 = c.value(kind, Criterion::CentrateAmmonia)?;

    let ts = input.value_or_zero(Analyte::TotalSolids);
    let vs = input.value_or_zero(Analyte::VolatileSolids);
    let captured = ts * capture;
    let cake_wet = if cake_pct > 0.0 {
        (captured / (cake_pct / 100.0)).min(input.flow())
    } else {
        input.flow()
    };
    let cake = input
        .with_flow(cake_wet)?
        .with_value(Analyte::TotalSolids, captured)?
        .with_value(Analyte::VolatileSolids, vs * capture)?;

    let centrate_m3 = ((input.flow() - cake_wet) / WATER_DENSITY_KG_M3).max(0.0);
    let mut centrate = Stream::liquid(centrate_m3)?;
    if centrate_m3 > 0.0 {
        let lost_tss_mg_l = (ts - captured) * 1_000.0 / centrate_m3;
        let lost_vss_mg_l = (vs - vs * capture) * 1_000.0 / centrate_m3;
        centrate = centrate.with_values([
            (Analyte::Tss, lost_tss_mg_l),
            (Analyte::Vss, lost_vss_mg_l),
            (Analyte::Ammonia, centrate_nh3),
            (Analyte::Tkn, centrate_nh3),
        ])?;
    }

    Ok(StageOutput {
        main: cake,
        side: Some(centrate),
    })
}

fn upgrade(input: &Stream, design: &StageDesign) -> StageResult<StageOutput> {
    let kind = StageKind::GasUpgrading;
    let c = &design.criteria;
    let recovery = c.value(kind, Criterion::MethaneRecovery)?.clamp(0.0, 1.0);
    let purity = c.value(kind, Criterion::ProductMethanePurity)?.clamp(0.0, 100.0);

    let flow = input.flow();
    let methane_in = flow * input.value_or_zero(Analyte::Methane) / 100.0;
    let methane_product = methane_in * recovery;
    let product_flow = if purity > 0.0 {
        (methane_product / (purity / 100.0)).min(flow)
    } else {
        0.0
    };
    let product_ch4_pct = if product_flow > 0.0 {
        100.0 * methane_product / product_flow
    } else {
        0.0
    };
    let h2s_in = input.value_or_zero(Analyte::HydrogenSulfide);
    let product = Stream::gas(product_flow)?.with_values([
        (Analyte::Methane, product_ch4_pct),
        (Analyte::CarbonDioxide, (100.0 - product_ch4_pct).max(0.0)),
        (Analyte::HydrogenSulfide, h2s_in.min(PRODUCT_H2S_PPMV)),
    ])?;

    let tail_flow = flow - product_flow;
    let tail_ch4_pct = if tail_flow > 0.0 {
        (100.0 * (methane_in - methane_product) / tail_flow).min(100.0)
    } else {
        0.0
    };
    let tail = Stream::gas(tail_flow)?.with_values([
        (Analyte::Methane, tail_ch4_pct),
        (Analyte::CarbonDioxide, (100.0 - tail_ch4_pct).max(0.0)),
    ])?;

    Ok(StageOutput {
        main: product,
        side: Some(tail),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DefaultTables;
    use pf_streams::StreamClass;

    fn design(kind: StageKind) -> StageDesign {
        DefaultTables::standard().design_for(kind)
    }

    fn raw_sewage() -> Stream {
        Stream::liquid(1_000.0)
            .unwrap()
            .with_values([
                (Analyte::Bod, 250.0),
                (Analyte::Tss, 250.0),
                (Analyte::Ammonia, 25.0),
            ])
            .unwrap()
            .with_additional("ph", pf_streams::Measured::new(7.2, "-"))
    }

    #[test]
    fn removal_leaves_undeclared_analytes_and_flow_alone() {
        let input = raw_sewage();
        let profile = RemovalProfile::cited("test", &[(Analyte::Bod, 0.9)]);
        let out = apply_removal(&input, &profile).unwrap();
        assert!((out.value(Analyte::Bod).unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(out.value(Analyte::Tss), Some(250.0));
        assert_eq!(out.flow(), 1_000.0);
        assert_eq!(out.additional().len(), 1);
        // input untouched
        assert_eq!(input.value(Analyte::Bod), Some(250.0));
    }

    #[test]
    fn nitrification_converts_ammonia_to_nitrate() {
        let out = transform(StageKind::Nitrification, &raw_sewage(), &design(StageKind::Nitrification))
            .unwrap()
            .main;
        assert!((out.value(Analyte::Ammonia).unwrap() - 2.5).abs() < 1e-9);
        assert!((out.value(Analyte::Nitrate).unwrap() - 22.5).abs() < 1e-9);
    }

    #[test]
    fn wrong_class_is_rejected() {
        let gas = Stream::gas(100.0).unwrap();
        let err = transform(StageKind::ActivatedSludge, &gas, &design(StageKind::ActivatedSludge));
        assert!(matches!(err, Err(StageError::ClassMismatch { .. })));
    }

    #[test]
    fn digestion_makes_biogas_from_destroyed_vs() {
        let feed = Stream::solids(10_000.0)
            .unwrap()
            .with_values([(Analyte::TotalSolids, 1_000.0), (Analyte::VolatileSolids, 800.0)])
            .unwrap();
        let out = transform(StageKind::Digestion, &feed, &design(StageKind::Digestion)).unwrap();
        // 800 × 0.6 = 480 kg VS destroyed; × 0.9 = 432 Nm3/d
        let biogas = out.side.unwrap();
        assert_eq!(biogas.class(), StreamClass::Gas);
        assert!((biogas.flow() - 432.0).abs() < 1e-9);
        assert!(biogas.gas_percent_total() <= 100.0 + 1e-9);
        assert!((out.main.value(Analyte::VolatileSolids).unwrap() - 320.0).abs() < 1e-9);
        assert!((out.main.value(Analyte::TotalSolids).unwrap() - 520.0).abs() < 1e-9);
        assert!(out.main.flow() < feed.flow());
    }

    #[test]
    fn dewatering_splits_cake_and_centrate() {
        let feed = Stream::solids(20_000.0)
            .unwrap()
            .with_values([(Analyte::TotalSolids, 1_000.0), (Analyte::VolatileSolids, 600.0)])
            .unwrap();
        let out = transform(StageKind::Dewatering, &feed, &design(StageKind::Dewatering)).unwrap();
        let cake = out.main;
        assert!((cake.value(Analyte::TotalSolids).unwrap() - 950.0).abs() < 1e-9);
        assert!((cake.solids_content_pct().unwrap() - 22.0).abs() < 1e-9);

        let centrate = out.side.unwrap();
        assert_eq!(centrate.class(), StreamClass::Liquid);
        let expected_m3 = (20_000.0 - 950.0 / 0.22) / 1_000.0;
        assert!((centrate.flow() - expected_m3).abs() < 1e-9);
        assert!(centrate.value(Analyte::Tss).unwrap() > 0.0);
    }

    #[test]
    fn dilution_only_when_above_target() {
        let thick = Stream::solids(1_000.0)
            .unwrap()
            .with_value(Analyte::TotalSolids, 250.0)
            .unwrap();
        let out = transform(StageKind::Dilution, &thick, &design(StageKind::Dilution)).unwrap();
        assert!((out.main.solids_content_pct().unwrap() - 12.0).abs() < 1e-9);

        let thin = thick.with_flow(10_000.0).unwrap();
        let out = transform(StageKind::Dilution, &thin, &design(StageKind::Dilution)).unwrap();
        assert_eq!(out.main, thin);
    }

    #[test]
    fn upgrading_conserves_methane() {
        let biogas = Stream::gas(1_000.0)
            .unwrap()
            .with_values([(Analyte::Methane, 60.0), (Analyte::CarbonDioxide, 39.0)])
            .unwrap();
        let out = transform(StageKind::GasUpgrading, &biogas, &design(StageKind::GasUpgrading)).unwrap();
        let product = out.main;
        let tail = out.side.unwrap();
        // 600 × 0.97 / 0.96
        assert!((product.flow() - 606.25).abs() < 1e-9);
        assert!((product.value(Analyte::Methane).unwrap() - 96.0).abs() < 1e-9);
        let ch4_out = product.flow() * product.value_or_zero(Analyte::Methane) / 100.0
            + tail.flow() * tail.value_or_zero(Analyte::Methane) / 100.0;
        assert!((ch4_out - 600.0).abs() < 1e-6);
        assert!((product.flow() + tail.flow() - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn conditioning_removes_h2s_only() {
        let biogas = Stream::gas(1_000.0)
            .unwrap()
            .with_values([(Analyte::Methane, 60.0), (Analyte::HydrogenSulfide, 2_000.0)])
            .unwrap();
        let out = transform(StageKind::GasConditioning, &biogas, &design(StageKind::GasConditioning))
            .unwrap()
            .main;
        assert!((out.value(Analyte::HydrogenSulfide).unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(out.value(Analyte::Methane), Some(60.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn removal_is_monotone(v in 0.0f64..1.0e6, e in 0.0f64..=1.0) {
                let input = Stream::liquid(100.0).unwrap().with_value(Analyte::Cod, v).unwrap();
                let profile = RemovalProfile::cited("test", &[(Analyte::Cod, e)]);
                let out = apply_removal(&input, &profile).unwrap();
                let got = out.value(Analyte::Cod).unwrap();
                prop_assert!((got - v * (1.0 - e)).abs() <= 1e-9 * v.max(1.0));
                prop_assert!(got <= v);
            }
        }
    }
}
