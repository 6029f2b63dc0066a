//! Receiving, feed preparation, digestion and dewatering equipment.
//!
//! Solids streams carry wet mass in kg/d; volumes use the stage's feed density.

use crate::common::{criterion, next_id, physical, pump_set, IdAllocator};
use crate::equipment::{EquipmentItem, Redundancy};
use crate::error::SizingResult;
use crate::liquid::mixers;
use pf_core::constants::WATER_DENSITY_KG_M3;
use pf_core::{units_required, HOURS_PER_DAY, SECONDS_PER_DAY};
use pf_stages::{Criterion, Stage};
use pf_streams::Analyte;

/// Specific heat of dilute sludge (kJ/kg/K).
const SLUDGE_SPECIFIC_HEAT: f64 = 4.186;
const MIN_DIGESTERS: u32 = 2;

fn feed_m3_per_day(stage: &Stage) -> SizingResult<f64> {
    let density = criterion(stage, Criterion::FeedDensity)?;
    let wet = stage.influent.flow();
    physical(if density > 0.0 { wet / density } else { 0.0 }, "feed volume")
}

/// Equivalent daily pumping rate when `m3_d` is moved during `operating_hours`.
fn compressed_rate(m3_d: f64, operating_hours: f64) -> f64 {
    if operating_hours <= 0.0 {
        return m3_d;
    }
    m3_d * HOURS_PER_DAY / operating_hours.min(HOURS_PER_DAY)
}

fn tank(
    stage: &Stage,
    ids: &mut IdAllocator,
    equipment_type: &str,
    description: &str,
    volume: f64,
    count: u32,
    basis: Criterion,
) -> SizingResult<EquipmentItem> {
    let volume = physical(volume, "tank volume")?;
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        equipment_type,
        description,
        Redundancy::Parallel(count),
        stage.criteria.basis(basis),
    )
    .spec("volume_each", volume / f64::from(count.max(1)), "m3", 0))
}

pub(crate) fn receiving(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let m3_d = feed_m3_per_day(stage)?;
    let days = criterion(stage, Criterion::StorageDays)?;
    let hours = criterion(stage, Criterion::OperatingHours)?;

    let storage = tank(
        stage,
        ids,
        "Receiving tank",
        "Covered receiving tanks for hauled feedstock",
        m3_d * days,
        2,
        Criterion::StorageDays,
    )?;
    let unloading = pump_set(
        stage,
        ids,
        "Unloading pump",
        "Truck unloading",
        compressed_rate(m3_d, hours),
    )?
    .note(stage.criteria.basis(Criterion::OperatingHours));
    Ok(vec![storage, unloading])
}

pub(crate) fn depackaging(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let throughput = criterion(stage, Criterion::UnitThroughput)?;
    let hours = criterion(stage, Criterion::OperatingHours)?;
    let reject = criterion(stage, Criterion::RejectFraction)?;

    let tonnes_per_hour = if hours > 0.0 {
        stage.influent.flow() / 1_000.0 / hours
    } else {
        0.0
    };
    let units = units_required(tonnes_per_hour, throughput);
    let redundancy = if units == 1 {
        Redundancy::Single
    } else {
        Redundancy::Parallel(units)
    };
    let mut item = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Depackager",
        "Packaged organics depackaging unit with reject conveyor",
        redundancy,
        stage.criteria.basis(Criterion::UnitThroughput),
    )
    .spec("required_throughput", tonnes_per_hour, "t/h", 2)
    .spec("reject_fraction", reject, "-", 2);
    if redundancy == Redundancy::Single {
        item = item.note("single unit: outages covered by receiving storage");
    }
    Ok(vec![item])
}

pub(crate) fn preparation(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let m3_d = feed_m3_per_day(stage)?;
    let throughput = criterion(stage, Criterion::UnitThroughput)?;
    let hours = criterion(stage, Criterion::OperatingHours)?;
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;

    let m3_h = if hours > 0.0 { m3_d / hours } else { 0.0 };
    let duty = units_required(m3_h, throughput);
    let macerators = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Macerator",
        "Inline macerating grinders",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::UnitThroughput),
    )
    .spec("throughput_each", m3_h / f64::from(duty), "m3/h", 1);

    let volume = m3_d * hrt / HOURS_PER_DAY;
    let mix_tank = tank(
        stage,
        ids,
        "Mix tank",
        "Feed blending tank",
        volume,
        1,
        Criterion::HydraulicRetentionTime,
    )?;
    let mixing = mixers(stage, ids, volume, 1)?;
    Ok(vec![macerators, mix_tank, mixing])
}

pub(crate) fn dilution(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let water_kg = (stage.effluent.flow() - stage.influent.flow()).max(0.0);
    let water_m3 = water_kg / WATER_DENSITY_KG_M3;
    let mut pumps = pump_set(stage, ids, "Dilution water pump", "Dilution water", water_m3)?
        .spec("dilution_water", water_m3, "m3/d", 1)
        .note(stage.criteria.basis(Criterion::TargetSolidsContent));
    if water_m3 <= 0.0 {
        pumps = pumps.note("feed already below target solids; pumps idle at design feed");
    }
    Ok(vec![pumps])
}

pub(crate) fn feed_equalization(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let m3_d = feed_m3_per_day(stage)?;
    let days = criterion(stage, Criterion::StorageDays)?;
    let volume = m3_d * days;

    let storage = tank(
        stage,
        ids,
        "Feed equalization tank",
        "Mixed digester feed tanks",
        volume,
        2,
        Criterion::StorageDays,
    )?;
    let mixing = mixers(stage, ids, volume, 2)?;
    let feed = pump_set(stage, ids, "Digester feed pump", "Digester feed", m3_d)?;
    Ok(vec![storage, mixing, feed])
}

pub(crate) fn digestion(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let m3_d = feed_m3_per_day(stage)?;
    let hrt = criterion(stage, Criterion::HydraulicRetentionTime)?;
    let olr = criterion(stage, Criterion::OrganicLoadingRate)?;
    let max_volume = criterion(stage, Criterion::MaxUnitVolume)?;
    let mixing_density = criterion(stage, Criterion::MixingPowerDensity)?;
    let t_op = criterion(stage, Criterion::OperatingTemperature)?;
    let t_feed = criterion(stage, Criterion::FeedTemperature)?;
    let allowance = criterion(stage, Criterion::HeatLossAllowance)?;

    let vs = stage.influent.value_or_zero(Analyte::VolatileSolids);
    let v_hrt = m3_d * hrt;
    let v_olr = if olr > 0.0 { vs / olr } else { 0.0 };
    let (volume, governing) = if v_olr > v_hrt {
        (v_olr, Criterion::OrganicLoadingRate)
    } else {
        (v_hrt, Criterion::HydraulicRetentionTime)
    };
    let volume = physical(volume, "digester volume")?;
    let count = units_required(volume, max_volume).max(MIN_DIGESTERS);
    let each = volume / f64::from(count);
    tracing::debug!(v_hrt, v_olr, count, "digester volume");

    let biogas = stage.side_stream.as_ref().map_or(0.0, |s| s.flow());
    let digesters = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Anaerobic digester",
        "Mesophilic complete-mix digesters with gas-tight covers",
        Redundancy::Parallel(count),
        stage.criteria.basis(governing),
    )
    .spec("volume_each", each, "m3", 0)
    .spec("total_volume", volume, "m3", 0)
    .spec("biogas_production", biogas, "Nm3/d", 0)
    .spec("mixing_power_each", each * mixing_density / 1_000.0, "kW", 1);

    let delta_t = (t_op - t_feed).max(0.0);
    let heat_kw = stage.influent.flow() * SLUDGE_SPECIFIC_HEAT * delta_t / SECONDS_PER_DAY
        * (1.0 + allowance);
    let heating = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Sludge heat exchanger",
        "Tube-in-tube sludge heat exchangers",
        Redundancy::Parallel(count),
        stage.criteria.basis(Criterion::OperatingTemperature),
    )
    .spec("heat_duty_total", physical(heat_kw, "heat duty")?, "kW", 1)
    .spec("heat_duty_each", heat_kw / f64::from(count), "kW", 1)
    .note(stage.criteria.basis(Criterion::HeatLossAllowance));

    Ok(vec![digesters, heating])
}

pub(crate) fn dewatering(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let throughput = criterion(stage, Criterion::UnitThroughput)?;
    let hours = criterion(stage, Criterion::OperatingHours)?;
    let dose = criterion(stage, Criterion::PolymerDose)?;

    let feed_m3_h = if hours > 0.0 {
        stage.influent.flow() / WATER_DENSITY_KG_M3 / hours
    } else {
        0.0
    };
    let duty = units_required(feed_m3_h, throughput);
    let cake = stage.effluent.flow();
    let centrifuges = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Decanter centrifuge",
        "High-solids decanter centrifuges",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::CakeSolidsContent),
    )
    .spec("feed_rate_each", feed_m3_h / f64::from(duty), "m3/h", 1)
    .spec("cake_production", cake, "kg/d", 0);

    let dry_tonnes = stage.influent.value_or_zero(Analyte::TotalSolids) / 1_000.0;
    let polymer = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Polymer system",
        "Emulsion polymer make-down and feed system",
        Redundancy::Parallel(1),
        stage.criteria.basis(Criterion::PolymerDose),
    )
    .spec("active_polymer", dry_tonnes * dose, "kg/d", 1);

    Ok(vec![centrifuges, polymer])
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

    fn slurry(wet: f64, ts_pct: f64) -> Stream {
        let ts = wet * ts_pct / 100.0;
        Stream::solids(wet)
            .unwrap()
            .with_values([(Analyte::TotalSolids, ts), (Analyte::VolatileSolids, 0.8 * ts)])
            .unwrap()
    }

    #[test]
    fn digesters_take_the_larger_volume_and_at_least_two() {
        // 100 m3/d at 10 % TS: HRT volume 2500, OLR volume 8000 kg / 3 = 2667
        let stage = evaluated(StageKind::Digestion, slurry(100_000.0, 10.0));
        let items = digestion(&stage, &mut IdAllocator::new()).unwrap();
        let digesters = &items[0];
        assert_eq!(digesters.quantity, 2);
        assert_eq!(digesters.spec_value("total_volume"), Some(2_667.0));
        assert!(digesters.design_basis.starts_with("Organic loading rate"));
        assert!(digesters.spec_value("biogas_production").unwrap() > 0.0);
    }

    #[test]
    fn heating_duty_hand_calc() {
        let stage = evaluated(StageKind::Digestion, slurry(86_400.0, 5.0));
        let items = digestion(&stage, &mut IdAllocator::new()).unwrap();
        // 1 kg/s x 4.186 x 22 K x 1.25
        assert_eq!(items[1].spec_value("heat_duty_total"), Some(115.1));
    }

    #[test]
    fn small_depackaging_is_a_single_unit() {
        let stage = evaluated(StageKind::Depackaging, slurry(20_000.0, 25.0));
        let items = depackaging(&stage, &mut IdAllocator::new()).unwrap();
        assert_eq!(items[0].quantity, 1);
        assert!(!items[0].notes.is_empty());
    }

    #[test]
    fn centrifuges_are_duty_standby() {
        let stage = evaluated(StageKind::Dewatering, slurry(400_000.0, 3.0));
        let items = dewatering(&stage, &mut IdAllocator::new()).unwrap();
        // 400 m3/d over 16 h = 25 m3/h, one duty plus one
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].spec_value("active_polymer"), Some(96.0));
    }

    #[test]
    fn dilution_pumps_move_the_added_water() {
        let stage = evaluated(StageKind::Dilution, slurry(10_000.0, 24.0));
        let items = dilution(&stage, &mut IdAllocator::new()).unwrap();
        // 2400 kg TS at 12 % -> 20000 kg wet, 10 m3/d of water
        assert_eq!(items[0].spec_value("dilution_water"), Some(10.0));
    }
}
