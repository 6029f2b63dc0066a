//! Nutrient removal, tertiary treatment, disinfection and digestate polishing.

use crate::common::{
    aeration_blowers, area_at_hourly_rate, basins, criterion, next_id, physical, pump_set,
    volume_m3, IdAllocator,
};
use crate::equipment::{EquipmentItem, Redundancy};
use crate::error::SizingResult;
use crate::liquid::mixers;
use pf_core::{hours, units_required, HOURS_PER_DAY};
use pf_stages::{Criterion, Stage};
use pf_streams::Analyte;

const TRAINS: u32 = 2;
const METHANOL_DENSITY_KG_M3: f64 = 791.0;
const P_MOLAR_MASS: f64 = 30.97;
const FE_MOLAR_MASS: f64 = 55.85;
const FECL3_MOLAR_MASS: f64 = 162.2;

/// Duty + standby chemical metering pumps for a liquid product rate.
fn metering_pumps(
    stage: &Stage,
    ids: &mut IdAllocator,
    chemical: &str,
    litres_per_day: f64,
    basis: Criterion,
) -> SizingResult<EquipmentItem> {
    let rate = physical(litres_per_day, "chemical feed rate")?;
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Chemical metering pump",
        format!("Diaphragm metering pumps, {chemical}"),
        Redundancy::n_plus_one(1),
        stage.criteria.basis(basis),
    )
    .spec("capacity_each", rate / HOURS_PER_DAY, "L/h", 2))
}

fn storage_tank(
    stage: &Stage,
    ids: &mut IdAllocator,
    chemical: &str,
    volume_m3: f64,
) -> SizingResult<EquipmentItem> {
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Chemical storage tank",
        format!("Bulk storage, {chemical}"),
        Redundancy::Parallel(1),
        stage.criteria.basis(Criterion::StorageDays),
    )
    .spec("volume", physical(volume_m3, "storage volume")?, "m3", 1))
}

pub(crate) fn nitrification(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let n_demand = criterion(stage, Criterion::NitrogenOxygenDemand)?;
    let o2_factor = criterion(stage, Criterion::OxygenDemandFactor)?;
    let alkalinity = criterion(stage, Criterion::AlkalinityDemand)?;

    let nh3_removed = stage.removed_load(Analyte::Ammonia);
    let oxygen = stage.removed_load(Analyte::Bod) * o2_factor + nh3_removed * n_demand;

    let basin = basins(
        stage,
        ids,
        "Nitrification basin",
        volume_m3(q, hours(hrt)),
        depth,
        TRAINS,
        Criterion::HydraulicRetentionTime,
    )?;
    let blowers = aeration_blowers(stage, ids, oxygen, depth)?;

    let alk_kg = nh3_removed * alkalinity;
    let alk_pumps = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Chemical metering pump",
        "Alkalinity supplement metering pumps",
        Redundancy::n_plus_one(1),
        stage.criteria.basis(Criterion::AlkalinityDemand),
    )
    .spec("alkalinity_demand", alk_kg, "kg CaCO3/d", 1)
    .note("product and strength fixed at detailed design");

    Ok(vec![basin, blowers, alk_pumps])
}

pub(crate) fn denitrification(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let r = criterion(stage, Criterion::RecycleRatio)?;
    let carbon = criterion(stage, Criterion::CarbonDoseRatio)?;
    let storage_days = criterion(stage, Criterion::StorageDays)?;

    let volume = volume_m3(q, hours(hrt));
    let basin = basins(stage, ids, "Anoxic basin", volume, depth, TRAINS, Criterion::HydraulicRetentionTime)?;
    let mixing = mixers(stage, ids, volume, TRAINS)?;
    let internal = pump_set(stage, ids, "Internal recycle pump", "Nitrate recycle", q * r)?
        .note(stage.criteria.basis(Criterion::RecycleRatio));

    let methanol_kg = stage.removed_load(Analyte::Nitrate) * carbon;
    let methanol_l = methanol_kg / METHANOL_DENSITY_KG_M3 * 1_000.0;
    let dosing = metering_pumps(stage, ids, "methanol", methanol_l, Criterion::CarbonDoseRatio)?
        .spec("methanol_dose", methanol_kg, "kg/d", 1);
    let storage = storage_tank(stage, ids, "methanol", methanol_l / 1_000.0 * storage_days)?;

    Ok(vec![basin, mixing, internal, dosing, storage])
}

pub(crate) fn chemical_phosphorus(
    stage: &Stage,
    ids: &mut IdAllocator,
) -> SizingResult<Vec<EquipmentItem>> {
    let ratio = criterion(stage, Criterion::MetalToPhosphorusRatio)?;
    let strength = criterion(stage, Criterion::SolutionStrength)?;
    let density = criterion(stage, Criterion::SolutionDensity)?;
    let storage_days = criterion(stage, Criterion::StorageDays)?;

    let p_removed = stage.removed_load(Analyte::TotalPhosphorus);
    let iron = p_removed / P_MOLAR_MASS * ratio * FE_MOLAR_MASS;
    let ferric_chloride = iron * FECL3_MOLAR_MASS / FE_MOLAR_MASS;
    let solution_kg = if strength > 0.0 { ferric_chloride / strength } else { 0.0 };
    let solution_l = if density > 0.0 { solution_kg / density } else { 0.0 };

    let dosing = metering_pumps(stage, ids, "ferric chloride", solution_l, Criterion::MetalToPhosphorusRatio)?
        .spec("phosphorus_removed", p_removed, "kg/d", 1)
        .spec("ferric_chloride_dose", ferric_chloride, "kg/d", 1);
    let storage = storage_tank(stage, ids, "ferric chloride", solution_l / 1_000.0 * storage_days)?;

    Ok(vec![dosing, storage])
}

pub(crate) fn tertiary_filtration(
    stage: &Stage,
    ids: &mut IdAllocator,
) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let flr = criterion(stage, Criterion::FilterLoadingRate)?;
    let backwash = criterion(stage, Criterion::BackwashFraction)?;
    let max_area = criterion(stage, Criterion::MaxUnitArea)?;

    let area = physical(area_at_hourly_rate(q, flr), "filter area")?;
    let duty = units_required(area, max_area);
    let filters = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Granular media filter",
        "Dual-media gravity filters, one cell in backwash",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::FilterLoadingRate),
    )
    .spec("total_area", area, "m2", 1)
    .spec("area_each", area / f64::from(duty), "m2", 1);

    let pumps = pump_set(stage, ids, "Backwash pump", "Filter backwash", q * backwash)?
        .note(stage.criteria.basis(Criterion::BackwashFraction));
    Ok(vec![filters, pumps])
}

pub(crate) fn disinfection(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let peak = stage.influent.flow() * criterion(stage, Criterion::PeakFactor)?;
    let dose = criterion(stage, Criterion::UvDose)?;
    let uvt = criterion(stage, Criterion::UvTransmittance)?;
    let bank = criterion(stage, Criterion::UvBankCapacity)?;

    let duty = units_required(peak, bank);
    let banks = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "UV bank",
        "Open-channel low-pressure high-output UV banks",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::UvDose),
    )
    .spec("peak_flow", peak, "m3/d", 0)
    .spec("capacity_each", bank, "m3/d", 0)
    .spec("design_dose", dose, "mJ/cm2", 0)
    .spec("uv_transmittance", uvt, "%", 0);
    Ok(vec![banks])
}

pub(crate) fn liquid_polishing(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let q = stage.influent.flow();
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let depth = criterion(stage, Criterion::BasinDepth)?;
    let o2_factor = criterion(stage, Criterion::OxygenDemandFactor)?;
    let n_demand = criterion(stage, Criterion::NitrogenOxygenDemand)?;

    let oxygen = stage.removed_load(Analyte::Bod) * o2_factor
        + stage.removed_load(Analyte::Ammonia) * n_demand;

    let reactors = basins(
        stage,
        ids,
        "SBR basin",
        volume_m3(q, hours(hrt)),
        depth,
        TRAINS,
        Criterion::HydraulicRetentionTime,
    )?;
    let blowers = aeration_blowers(stage, ids, oxygen, depth)?;
    let decant = pump_set(stage, ids, "Decant pump", "Treated digestate decant", q)?;
    Ok(vec![reactors, blowers, decant])
}
