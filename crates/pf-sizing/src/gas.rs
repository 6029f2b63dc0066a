//! Biogas conditioning, upgrading and management equipment.

use crate::common::{criterion, next_id, physical, IdAllocator};
use crate::equipment::{EquipmentItem, Redundancy};
use crate::error::SizingResult;
use pf_core::{units_required, HOURS_PER_DAY};
use pf_stages::{Criterion, Stage};
use pf_streams::Analyte;

/// H₂S density at normal conditions (kg/Nm³).
const H2S_DENSITY_KG_NM3: f64 = 1.536;

fn hourly(stage: &Stage) -> f64 {
    stage.influent.flow() / HOURS_PER_DAY
}

pub(crate) fn conditioning(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let peak_factor = criterion(stage, Criterion::GasPeakFactor)?;
    let ebct = criterion(stage, Criterion::EmptyBedContactTime)?;
    let blower_capacity = criterion(stage, Criterion::BlowerUnitCapacity)?;

    let peak_nm3_h = hourly(stage) * peak_factor;
    let h2s_in = stage.influent.value_or_zero(Analyte::HydrogenSulfide);
    let h2s_out = stage.effluent.value_or_zero(Analyte::HydrogenSulfide);
    let sulfide_kg_d =
        stage.influent.flow() * (h2s_in - h2s_out).max(0.0) * 1e-6 * H2S_DENSITY_KG_NM3;

    let bed_volume = physical(peak_nm3_h / 60.0 * ebct, "media bed volume")?;
    let vessels = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "H2S scrubber vessel",
        "Iron-oxide media vessels in lead/lag arrangement",
        Redundancy::Parallel(2),
        stage.criteria.basis(Criterion::EmptyBedContactTime),
    )
    .spec("media_volume_each", bed_volume, "m3", 1)
    .spec("h2s_removed", sulfide_kg_d, "kg/d", 2)
    .note("lead/lag: either vessel carries the full flow during media change-out");

    let duty = units_required(peak_nm3_h, blower_capacity);
    let blowers = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Biogas blower",
        "Explosion-proof biogas booster blowers",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::GasPeakFactor),
    )
    .spec("capacity_each", peak_nm3_h / f64::from(duty), "Nm3/h", 0);

    let chiller = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Gas chiller",
        "Biogas chiller and reheater for moisture removal",
        Redundancy::Parallel(1),
        stage.criteria.basis(Criterion::GasPeakFactor),
    )
    .spec("capacity", peak_nm3_h, "Nm3/h", 0);

    Ok(vec![vessels, blowers, chiller])
}

pub(crate) fn upgrading(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let peak_factor = criterion(stage, Criterion::GasPeakFactor)?;
    let skid_capacity = criterion(stage, Criterion::UpgraderUnitCapacity)?;
    let specific_power = criterion(stage, Criterion::CompressorSpecificPower)?;
    let purity = criterion(stage, Criterion::ProductMethanePurity)?;

    let peak_nm3_h = hourly(stage) * peak_factor;
    let product_nm3_h = stage.effluent.flow() / HOURS_PER_DAY;

    let skids = units_required(peak_nm3_h, skid_capacity);
    let upgraders = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Upgrading skid",
        "Membrane biogas upgrading skids",
        Redundancy::Parallel(skids),
        stage.criteria.basis(Criterion::UpgraderUnitCapacity),
    )
    .spec("inlet_capacity_each", peak_nm3_h / f64::from(skids), "Nm3/h", 0)
    .spec("product_flow", product_nm3_h, "Nm3/h", 0)
    .spec("product_methane", purity, "%", 1)
    .note(stage.criteria.basis(Criterion::MethaneRecovery));

    let duty = skids;
    let per_unit = peak_nm3_h / f64::from(duty);
    let compressors = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Feed compressor",
        "Oil-injected screw compressors feeding the upgrading skids",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::CompressorSpecificPower),
    )
    .spec("capacity_each", per_unit, "Nm3/h", 0)
    .spec("motor_power_each", physical(per_unit * specific_power, "compressor power")?, "kW", 1);

    Ok(vec![upgraders, compressors])
}

pub(crate) fn management(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    let flare_factor = criterion(stage, Criterion::FlareCapacityFactor)?;
    let storage_hours = criterion(stage, Criterion::GasStorageHours)?;
    let nm3_h = hourly(stage);

    let flare = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Emergency flare",
        "Enclosed ground flare",
        Redundancy::Single,
        stage.criteria.basis(Criterion::FlareCapacityFactor),
    )
    .spec("capacity", nm3_h * flare_factor, "Nm3/h", 0)
    .note("single unit: flares only during upgrading outages");

    let holder = EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Gas holder",
        "Double-membrane gas holder",
        Redundancy::Single,
        stage.criteria.basis(Criterion::GasStorageHours),
    )
    .spec("storage_volume", nm3_h * storage_hours, "m3", 0)
    .note("single unit: sized on raw biogas production");

    Ok(vec![flare, holder])
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

    fn biogas(nm3_d: f64) -> Stream {
        Stream::gas(nm3_d)
            .unwrap()
            .with_values([
                (Analyte::Methane, 60.0),
                (Analyte::CarbonDioxide, 39.0),
                (Analyte::HydrogenSulfide, 1_500.0),
            ])
            .unwrap()
    }

    #[test]
    fn flare_and_holder_are_single_units() {
        let stage = evaluated(StageKind::GasManagement, biogas(24_000.0));
        let items = management(&stage, &mut IdAllocator::new()).unwrap();
        assert!(items.iter().all(|i| i.quantity == 1 && !i.notes.is_empty()));
        assert_eq!(items[0].spec_value("capacity"), Some(1_250.0));
        assert_eq!(items[1].spec_value("storage_volume"), Some(4_000.0));
    }

    #[test]
    fn conditioning_removes_sulfide_with_lead_lag_vessels() {
        let stage = evaluated(StageKind::GasConditioning, biogas(24_000.0));
        let items = conditioning(&stage, &mut IdAllocator::new()).unwrap();
        assert_eq!(items[0].quantity, 2);
        assert!(items[0].spec_value("h2s_removed").unwrap() > 50.0);
        // 1250 Nm3/h peak over 1000 Nm3/h blowers
        assert_eq!(items[1].quantity, 3);
    }

    #[test]
    fn compressor_power_from_specific_power() {
        let stage = evaluated(StageKind::GasUpgrading, biogas(19_200.0));
        let items = upgrading(&stage, &mut IdAllocator::new()).unwrap();
        // 800 x 1.25 = 1000 Nm3/h in one skid
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].quantity, 2);
        assert_eq!(items[1].spec_value("motor_power_each"), Some(250.0));
        assert!(items[0].spec_value("product_flow").unwrap() > 0.0);
    }
}
