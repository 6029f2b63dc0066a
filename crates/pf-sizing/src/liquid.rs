//! Headworks, clarification and secondary treatment equipment.

use crate::common::{
    aeration_blowers, area_at_hourly_rate, area_m2, basins, blower_power_kw, circular_units,
    criterion, next_id, physical, pump_set, volume_m3, IdAllocator,
};
use crate::equipment::{EquipmentItem, Redundancy};
use crate::error::SizingResult;
use pf_core::constants::WATER_DENSITY_KG_M3;
use pf_core::{hours, m_per_day, units_required, HOURS_PER_DAY, MINUTES_PER_DAY};
use pf_stages::{Criterion, Stage};
use pf_streams::Analyte;

/// Clarifiers and biological trains are never built as a single unit.
const MIN_PARALLEL_UNITS: u32 = 2;
/// Mixed volume served by one submersible mixer (m³).
const MIXER_COVERAGE_M3: f64 = 2_000.0;

/// Wet sludge volume (m³/d) for a dry-solids load at a solids content.
fn sludge_volume(solids_kg_d: f64, solids_pct: f64) -> f64 {
    if solids_pct <= 0.0 {
        return 0.0;
    }
    solids_kg_d / (solids_pct / 100.0) / WATER_DENSITY_KG_M3
}

pub(crate) fn mixers(
    stage: &Stage,
    ids: &mut IdAllocator,
    volume: f64,
    basin_count: u32,
) -> SizingResult<EquipmentItem> {
    let density = criterion(stage, Criterion::MixingPowerDensity)?;
    let per_basin = volume / f64::from(basin_count.max(1));
    let count = units_required(per_basin, MIXER_COVERAGE_M3) * basin_count.max(1);
    let total_kw = volume * density / 1_000.0;
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Submersible mixer",
        "Submersible propeller mixers",
        Redundancy::Parallel(count),
        stage.criteria.basis(Criterion::MixingPowerDensity),
    )
    .spec("power_each", total_kw / f64::from(count), "kW", 1)
    .spec("installed_power", total_kw, "kW", 1))
}

fn clarifiers(
    stage: &Stage,
    ids: &mut IdAllocator,
    equipment_type: &str,
    flow_m3_d: f64,
) -> SizingResult<EquipmentItem> {
    let sor = criterion(stage, Criterion::SurfaceOverflowRate)?;
    let swd = criterion(stage, Criterion::SideWaterDepth)?;
    let max_dia = criterion(stage, Criterion::MaxUnitDiameter)?;

    let area = physical(area_m2(flow_m3_d, m_per_day(sor)), "clarifier area")?;
    let (count, diameter) = circular_units(area, max_dia, MIN_PARALLEL_UNITS);
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        equipment_type,
        "Circular center-feed clarifiers with rotating sludge collectors",
        Redundancy::Parallel(count),
        stage.criteria.basis(Criterion::SurfaceOverflowRate),
    )
    .spec("diameter", diameter, "m", 1)
    .spec("side_water_depth", swd, "m", 1)
    .spec("surface_area_each", area / f64::from(count), "m2", 0)
    .spec("surface_overflow_rate", sor, "m3/m2/d", 1))
}

pub(crate) fn preliminary(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let peak = q * criterion(stage, Criterion::PeakFactor)?;
    let screen_capacity = criterion(stage, Criterion::ScreenUnitCapacity)?;
    let bar_spacing = criterion(stage, Criterion::ScreenBarSpacing)?;
    let grit_minutes = criterion(stage, Criterion::GritDetentionTime)?;

    let channels = units_required(peak, screen_capacity);
    let screens = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Fine screen",
        "Mechanically cleaned fine screens with washer-compactors",
        Redundancy::n_plus_one(channels),
        stage.criteria.basis(Criterion::ScreenUnitCapacity),
    )
    .spec("peak_flow", peak, "m3/d", 0)
    .spec("capacity_each", peak / f64::from(channels), "m3/d", 0)
    .spec("bar_spacing", bar_spacing, "mm", 0);

    let grit_volume = peak / MINUTES_PER_DAY * grit_minutes;
    let grit = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Grit chamber",
        "Vortex grit chambers with grit pumps and classifiers",
        Redundancy::n_plus_one(channels),
        stage.criteria.basis(Criterion::GritDetentionTime),
    )
    .spec("volume_each", grit_volume / f64::from(channels), "m3", 1)
    .spec("detention_time", grit_minutes, "min", 1);

    let pumps = pump_set(stage, ids, "Influent pump", "Raw sewage lift", peak)?
        .note("sized at peak flow");

    Ok(vec![screens, grit, pumps])
}

pub(crate) fn equalization(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let volume = volume_m3(q, hours(hrt));

    let basin = basins(
        stage,
        ids,
        "Equalization basin",
        volume,
        depth,
        MIN_PARALLEL_UNITS,
        Criterion::HydraulicRetentionTime,
    )?;
    let mixing = mixers(stage, ids, volume, MIN_PARALLEL_UNITS)?;
    Ok(vec![basin, mixing])
}

pub(crate) fn primary_clarifier(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let sludge_pct = criterion(stage, Criterion::SludgeSolidsContent)?;
    let clar = clarifiers(stage, ids, "Primary clarifier", q)?;

    let sludge_kg = stage.removed_load(Analyte::Tss);
    let sludge_m3 = sludge_volume(sludge_kg, sludge_pct);
    let pumps = pump_set(stage, ids, "Primary sludge pump", "Primary sludge", sludge_m3)?
        .spec("sludge_solids", sludge_kg, "kg/d", 0)
        .spec("sludge_volume", sludge_m3, "m3/d", 1);

    Ok(vec![clar, pumps])
}

pub(crate) fn flotation(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hlr = criterion(stage, Criterion::HydraulicLoadingRate)?;
    let r = criterion(stage, Criterion::RecycleRatio)?;
    let max_area = criterion(stage, Criterion::MaxUnitArea)?;
    let float_pct = criterion(stage, Criterion::SludgeSolidsContent)?;

    let area = physical(area_at_hourly_rate(q * (1.0 + r), hlr), "flotation area")?;
    let count = units_required(area, max_area).max(MIN_PARALLEL_UNITS);
    let float_kg = stage.removed_load(Analyte::Tss) + stage.removed_load(Analyte::Fog);

    let units = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "DAF unit",
        "Rectangular dissolved air flotation units with float skimmers",
        Redundancy::Parallel(count),
        stage.criteria.basis(Criterion::HydraulicLoadingRate),
    )
    .spec("surface_area_each", area / f64::from(count), "m2", 1)
    .spec("float_solids", float_kg, "kg/d", 0)
    .spec("float_volume", sludge_volume(float_kg, float_pct), "m3/d", 1);

    let recycle = pump_set(stage, ids, "Recycle pressurization pump", "Pressurized recycle", q * r)?
        .note(stage.criteria.basis(Criterion::RecycleRatio));

    Ok(vec![units, recycle])
}

pub(crate) fn activated_sludge(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let kind = stage.kind;
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let srt = criterion(stage, Criterion::SolidsRetentionTime)?;
    let mlss = criterion(stage, Criterion::MixedLiquorSuspendedSolids)?;
    let r = criterion(stage, Criterion::RecycleRatio)?;
    let o2_factor = criterion(stage, Criterion::OxygenDemandFactor)?;
    let yield_factor = criterion(stage, Criterion::ObservedYield)?;

    let bod_removed = stage.removed_load(Analyte::Bod);
    let px = bod_removed * yield_factor;
    let v_hrt = volume_m3(q, hours(hrt));
    let v_srt = if mlss > 0.0 { srt * px * 1_000.0 / mlss } else { 0.0 };
    let (volume, governing) = if v_srt > v_hrt {
        (v_srt, Criterion::SolidsRetentionTime)
    } else {
        (v_hrt, Criterion::HydraulicRetentionTime)
    };
    tracing::debug!(?kind, v_hrt, v_srt, "aeration volume");

    let basin = basins(stage, ids, "Aeration basin", volume, depth, MIN_PARALLEL_UNITS, governing)?
        .spec("mlss", mlss, "mg/L", 0)
        .spec("waste_sludge", px, "kg/d", 0);
    let blowers = aeration_blowers(stage, ids, bod_removed * o2_factor, depth)?;
    let clar = clarifiers(stage, ids, "Secondary clarifier", q)?;

    let return_conc = if r > 0.0 { mlss * (1.0 + r) / r } else { mlss };
    let was_m3 = if return_conc > 0.0 { px * 1_000.0 / return_conc } else { 0.0 };
    let ras = pump_set(stage, ids, "RAS pump", "Return activated sludge", q * r)?
        .note(stage.criteria.basis(Criterion::RecycleRatio));
    let was = pump_set(stage, ids, "WAS pump", "Waste activated sludge", was_m3)?
        .spec("waste_volume", was_m3, "m3/d", 1);

    Ok(vec![basin, blowers, clar, ras, was])
}

pub(crate) fn membrane_bioreactor(
    stage: &Stage,
    ids: &mut IdAllocator,
) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let r = criterion(stage, Criterion::RecycleRatio)?;
    let flux = criterion(stage, Criterion::DesignFlux)?;
    let scour = criterion(stage, Criterion::MembraneScourAir)?;
    let module_area = criterion(stage, Criterion::MembraneUnitArea)?;
    let blower_capacity = criterion(stage, Criterion::BlowerUnitCapacity)?;
    let o2_factor = criterion(stage, Criterion::OxygenDemandFactor)?;

    let volume = volume_m3(q, hours(hrt));
    let basin = basins(
        stage,
        ids,
        "Bioreactor basin",
        volume,
        depth,
        MIN_PARALLEL_UNITS,
        Criterion::HydraulicRetentionTime,
    )?;

    // L/m2/h flux against m3/d permeate
    let membrane_area = if flux > 0.0 { q * 1_000.0 / HOURS_PER_DAY / flux } else { 0.0 };
    let cassettes = units_required(membrane_area, module_area);
    let membranes = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Membrane cassette",
        "Submerged hollow-fibre membrane cassettes",
        Redundancy::Parallel(cassettes),
        stage.criteria.basis(Criterion::DesignFlux),
    )
    .spec("total_membrane_area", membrane_area, "m2", 0)
    .spec("area_each", module_area, "m2", 0)
    .spec("design_flux", flux, "L/m2/h", 1);

    let scour_m3_min = membrane_area * scour / 60.0;
    let scour_duty = units_required(scour_m3_min, blower_capacity);
    let scour_each = scour_m3_min / f64::from(scour_duty);
    let scour_blowers = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Membrane scour blower",
        "Air scour blowers for membrane cassettes",
        Redundancy::n_plus_one(scour_duty),
        stage.criteria.basis(Criterion::MembraneScourAir),
    )
    .spec("airflow_each", scour_each, "m3/min", 1)
    .spec("motor_power_each", blower_power_kw(scour_each, depth), "kW", 1);

    let process_blowers =
        aeration_blowers(stage, ids, stage.removed_load(Analyte::Bod) * o2_factor, depth)?;
    let permeate = pump_set(stage, ids, "Permeate pump", "Membrane permeate", q)?;
    let recirculation = pump_set(stage, ids, "Recirculation pump", "Mixed liquor recirculation", q * r)?
        .note(stage.criteria.basis(Criterion::RecycleRatio));

    Ok(vec![basin, membranes, scour_blowers, process_blowers, permeate, recirculation])
}

pub(crate) fn trickling_filter(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let olr = criterion(stage, Criterion::OrganicLoadingRate)?;
    let media_depth = criterion(stage, Criterion::MediaDepth)?;
    let r = criterion(stage, Criterion::RecycleRatio)?;
    let max_dia = criterion(stage, Criterion::MaxUnitDiameter)?;

    let bod_load = stage.influent.load_kg_per_day(Analyte::Bod).unwrap_or(0.0);
    let media_volume = if olr > 0.0 { bod_load / olr } else { 0.0 };
    let plan_area = if media_depth > 0.0 { media_volume / media_depth } else { 0.0 };
    let (count, diameter) = circular_units(plan_area, max_dia, MIN_PARALLEL_UNITS);

    let filters = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Trickling filter",
        "Plastic-media trickling filters with rotary distributors",
        Redundancy::Parallel(count),
        stage.criteria.basis(Criterion::OrganicLoadingRate),
    )
    .spec("diameter", diameter, "m", 1)
    .spec("media_depth", media_depth, "m", 1)
    .spec("media_volume_total", media_volume, "m3", 0);

    let recirculation = pump_set(stage, ids, "Recirculation pump", "Filter recirculation", q * r)?
        .note(stage.criteria.basis(Criterion::RecycleRatio));
    let humus = clarifiers(stage, ids, "Humus clarifier", q)?;

    Ok(vec![filters, recirculation, humus])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_stages::{DefaultTables, StageKind};
    use pf_streams::Stream;

    fn evaluated(kind: StageKind, feed: Stream) -> Stage {
        let mut stage = Stage::new(kind, DefaultTables::standard().design_for(kind));
        stage.evaluate(feed).unwrap();
        stage
    }

    fn sewage(flow: f64) -> Stream {
        Stream::liquid(flow)
            .unwrap()
            .with_values([
                (Analyte::Bod, 250.0),
                (Analyte::Tss, 250.0),
                (Analyte::Fog, 100.0),
            ])
            .unwrap()
    }

    #[test]
    fn preliminary_has_duty_standby_screens_grit_and_pumps() {
        let stage = evaluated(StageKind::Preliminary, sewage(4_000.0));
        let items = preliminary(&stage, &mut IdAllocator::new()).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.quantity >= 2));
        // 4000 x 2.5 peak in one 20000 m3/d channel
        assert_eq!(items[0].spec_value("peak_flow"), Some(10_000.0));
        assert_eq!(items[0].id, "PT-001");
        assert_eq!(items[2].id, "PT-003");
    }

    #[test]
    fn primary_clarifier_area_follows_overflow_rate() {
        let stage = evaluated(StageKind::PrimaryClarifier, sewage(4_000.0));
        let items = primary_clarifier(&stage, &mut IdAllocator::new()).unwrap();
        let clar = &items[0];
        assert_eq!(clar.quantity, 2);
        // 4000 / 40 = 100 m2 over two units
        assert_eq!(clar.spec_value("surface_area_each"), Some(50.0));
    }

    #[test]
    fn activated_sludge_volume_is_at_least_hrt_volume() {
        let stage = evaluated(StageKind::ActivatedSludge, sewage(4_000.0));
        let items = activated_sludge(&stage, &mut IdAllocator::new()).unwrap();
        let basin = &items[0];
        let total = basin.spec_value("volume_each").unwrap() * f64::from(basin.quantity);
        assert!(total >= 1_000.0 - 1.0);
        assert!(items.iter().any(|i| i.equipment_type == "Aeration blower" && i.quantity >= 2));
        assert!(items.iter().any(|i| i.equipment_type == "Secondary clarifier" && i.quantity >= 2));
    }

    #[test]
    fn membrane_area_from_flux() {
        let stage = evaluated(StageKind::MembraneBioreactor, sewage(4_800.0));
        let items = membrane_bioreactor(&stage, &mut IdAllocator::new()).unwrap();
        let membranes = items
            .iter()
            .find(|i| i.equipment_type == "Membrane cassette")
            .unwrap();
        // 4800 m3/d = 200 m3/h = 200000 L/h at 20 L/m2/h
        assert_eq!(membranes.spec_value("total_membrane_area"), Some(10_000.0));
        assert_eq!(membranes.quantity, 20);
    }

    #[test]
    fn trickling_filter_media_from_organic_load() {
        let stage = evaluated(StageKind::TricklingFilter, sewage(2_000.0));
        let items = trickling_filter(&stage, &mut IdAllocator::new()).unwrap();
        // 2000 m3/d x 250 mg/L = 500 kg/d at 0.5 kg/m3/d
        assert_eq!(items[0].spec_value("media_volume_total"), Some(1_000.0));
        assert!(items[0].quantity >= 2);
    }

    #[test]
    fn flotation_units_are_parallel() {
        let stage = evaluated(StageKind::DissolvedAirFlotation, sewage(3_000.0));
        let items = flotation(&stage, &mut IdAllocator::new()).unwrap();
        assert!(items[0].quantity >= 2);
        assert!(items[0].spec_value("float_solids").unwrap() > 0.0);
    }
}
