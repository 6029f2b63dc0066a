//! Shared sizing helpers: ids, criteria lookup, pump and blower sets.

use crate::equipment::{EquipmentItem, Redundancy};
use crate::error::{SizingError, SizingResult};
use pf_core::constants::{AIR_DENSITY_KG_M3, AIR_OXYGEN_MASS_FRACTION};
use pf_core::{
    area_for_loading, m, m3_per_day, pumping_power, read, units_required, volume_for_detention,
    Time, Velocity, HOURS_PER_DAY, MINUTES_PER_DAY,
};
use pf_stages::{Criterion, Stage};
use std::collections::BTreeMap;

/// Hands out sequential equipment ids per process tag ("AS-001", "AS-002", ...).
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: BTreeMap<String, u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, tag: &str) -> String {
        let n = self.counters.entry(tag.to_string()).or_insert(0);
        *n += 1;
        format!("{tag}-{:03}", *n)
    }
}

/// Required criterion of the stage being sized.
pub(crate) fn criterion(stage: &Stage, c: Criterion) -> SizingResult<f64> {
    Ok(stage.criteria.value(stage.kind, c)?)
}

/// Reject NaN, infinities and negatives before they reach a spec.
pub(crate) fn physical(value: f64, what: &'static str) -> SizingResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SizingError::NonPhysical { what })
    }
}

/// Item id for the stage's process tag.
pub(crate) fn next_id(stage: &Stage, ids: &mut IdAllocator) -> String {
    ids.next(stage.kind.tag())
}

pub(crate) fn area_m2(flow_m3_d: f64, loading: Velocity) -> f64 {
    read::square_meters(area_for_loading(m3_per_day(flow_m3_d), loading))
}

pub(crate) fn volume_m3(flow_m3_d: f64, detention: Time) -> f64 {
    read::cubic_meters(volume_for_detention(m3_per_day(flow_m3_d), detention))
}

/// Circular units covering `total_area`, at least `min_units`, each no wider than `max_diameter`.
///
/// Returns (count, diameter of each).
pub(crate) fn circular_units(total_area: f64, max_diameter: f64, min_units: u32) -> (u32, f64) {
    let max_area = std::f64::consts::PI * (max_diameter / 2.0).powi(2);
    let n = units_required(total_area, max_area).max(min_units);
    let each = total_area / f64::from(n);
    (n, (4.0 * each / std::f64::consts::PI).sqrt())
}

/// Duty + standby pump set moving `flow_m3_d` using the stage's pump criteria.
pub(crate) fn pump_set(
    stage: &Stage,
    ids: &mut IdAllocator,
    equipment_type: &str,
    service: &str,
    flow_m3_d: f64,
) -> SizingResult<EquipmentItem> {
    let flow = physical(flow_m3_d, "pump flow")?;
    let capacity = criterion(stage, Criterion::PumpUnitCapacity)?;
    let head = criterion(stage, Criterion::PumpTotalDynamicHead)?;
    let efficiency = criterion(stage, Criterion::PumpEfficiency)?;

    let duty = units_required(flow, capacity);
    let per_unit = flow / f64::from(duty);
    let power = read::kilowatts(pumping_power(m3_per_day(per_unit), m(head), efficiency));

    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        equipment_type,
        format!("{service} pumps"),
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::PumpUnitCapacity),
    )
    .spec("capacity_each", per_unit / HOURS_PER_DAY, "m3/h", 1)
    .spec("total_dynamic_head", head, "m", 1)
    .spec("shaft_power_each", physical(power, "pump power")?, "kW", 1))
}

/// Air flow (m³/min) delivering `oxygen_kg_d` at a transfer efficiency, with safety factor.
pub(crate) fn air_for_oxygen(oxygen_kg_d: f64, transfer_efficiency: f64, safety_factor: f64) -> f64 {
    if transfer_efficiency <= 0.0 {
        return 0.0;
    }
    let air_kg_d = oxygen_kg_d / (transfer_efficiency * AIR_OXYGEN_MASS_FRACTION);
    air_kg_d / AIR_DENSITY_KG_M3 / MINUTES_PER_DAY * safety_factor
}

/// Adiabatic compression power (kW) for `air_m3_min` discharged against `submergence_m` of water.
///
/// Inlet at 20 °C and 1 atm, 14 kPa of piping and diffuser losses, 70 % blower efficiency.
pub fn blower_power_kw(air_m3_min: f64, submergence_m: f64) -> f64 {
    const R: f64 = 8.314;
    const T_INLET_K: f64 = 293.15;
    const EFFICIENCY: f64 = 0.70;
    const LOSSES_KPA: f64 = 14.0;
    const P_ATM_KPA: f64 = 101.325;

    let mass_kg_s = air_m3_min * AIR_DENSITY_KG_M3 / 60.0;
    let p2 = P_ATM_KPA + 9.81 * submergence_m.max(0.0) + LOSSES_KPA;
    mass_kg_s * R * T_INLET_K / (29.7 * 0.283 * EFFICIENCY) * ((p2 / P_ATM_KPA).powf(0.283) - 1.0)
}

/// Duty + standby aeration blowers for an oxygen demand at a basin depth.
pub(crate) fn aeration_blowers(
    stage: &Stage,
    ids: &mut IdAllocator,
    oxygen_kg_d: f64,
    depth_m: f64,
) -> SizingResult<EquipmentItem> {
    let ote = criterion(stage, Criterion::OxygenTransferEfficiency)?;
    let sf = criterion(stage, Criterion::AerationSafetyFactor)?;
    let capacity = criterion(stage, Criterion::BlowerUnitCapacity)?;

    let air = physical(air_for_oxygen(oxygen_kg_d, ote, sf), "aeration air")?;
    let duty = units_required(air, capacity);
    let per_unit = air / f64::from(duty);

    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        "Aeration blower",
        "Positive displacement or turbo blowers feeding fine-bubble diffusers",
        Redundancy::n_plus_one(duty),
        stage.criteria.basis(Criterion::OxygenTransferEfficiency),
    )
    .spec("oxygen_demand", oxygen_kg_d, "kg O2/d", 0)
    .spec("airflow_each", per_unit, "m3/min", 1)
    .spec("discharge_submergence", depth_m, "m", 1)
    .spec("motor_power_each", blower_power_kw(per_unit, depth_m), "kW", 1))
}

/// Parallel rectangular basins holding `volume` at `depth`.
pub(crate) fn basins(
    stage: &Stage,
    ids: &mut IdAllocator,
    equipment_type: &str,
    volume: f64,
    depth: f64,
    count: u32,
    basis: Criterion,
) -> SizingResult<EquipmentItem> {
    let volume = physical(volume, "basin volume")?;
    let each = volume / f64::from(count.max(1));
    let area = if depth > 0.0 { each / depth } else { 0.0 };
    Ok(EquipmentItem::new(
        next_id(stage, ids),
        &stage.name,
        equipment_type,
        format!("{} parallel {}", count.max(1), equipment_type.to_lowercase()),
        Redundancy::Parallel(count),
        stage.criteria.basis(basis),
    )
    .spec("volume_each", each, "m3", 0)
    .spec("side_water_depth", depth, "m", 1)
    .spec("plan_area_each", area, "m2", 0))
}

/// Plan area from a loading rate given in m³/m²/h.
pub(crate) fn area_at_hourly_rate(flow_m3_d: f64, rate_m_h: f64) -> f64 {
    if rate_m_h <= 0.0 {
        return 0.0;
    }
    area_m2(flow_m3_d, pf_core::m_per_hour(rate_m_h))
}
