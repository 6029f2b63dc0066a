// pf-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, Area as UomArea, Length as UomLength,
    MassDensity as UomMassDensity, Power as UomPower, Time as UomTime,
    Velocity as UomVelocity, Volume as UomVolume, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Time = UomTime;
pub type Velocity = UomVelocity;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const HOURS_PER_DAY: f64 = 24.0;
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Volumetric flow from m³/d.
#[inline]
pub fn m3_per_day(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v / SECONDS_PER_DAY)
}

/// Surface or hydraulic loading rate from m³/m²/d (= m/d).
#[inline]
pub fn m_per_day(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v / SECONDS_PER_DAY)
}

/// Hydraulic loading rate from m³/m²/h (= m/h).
#[inline]
pub fn m_per_hour(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v / 3_600.0)
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

/// Readback helpers so callers never touch raw SI base values.
pub mod read {
    use super::*;

    #[inline]
    pub fn square_meters(a: Area) -> f64 {
        a.get::<uom::si::area::square_meter>()
    }

    #[inline]
    pub fn cubic_meters(v: Volume) -> f64 {
        v.get::<uom::si::volume::cubic_meter>()
    }

    #[inline]
    pub fn kilowatts(p: Power) -> f64 {
        p.get::<uom::si::power::kilowatt>()
    }

    #[inline]
    pub fn cubic_meters_per_day(q: VolumeRate) -> f64 {
        q.get::<uom::si::volume_rate::cubic_meter_per_second>() * SECONDS_PER_DAY
    }
}

/// Required plan area for a flow at a surface (or hydraulic) loading rate.
pub fn area_for_loading(flow: VolumeRate, loading: Velocity) -> Area {
    flow / loading
}

/// Volume holding a flow for a detention time.
pub fn volume_for_detention(flow: VolumeRate, detention: Time) -> Volume {
    flow * detention
}

/// Shaft power lifting `flow` through `head` at wire-to-water efficiency `eta`.
pub fn pumping_power(flow: VolumeRate, head: Length, eta: f64) -> Power {
    let hydraulic: Power = kg_per_m3(constants::WATER_DENSITY_KG_M3) * constants::g0() * flow * head;
    if eta > 0.0 { hydraulic / eta } else { hydraulic }
}

pub mod constants {
    use super::*;

    pub const G0_MPS2: f64 = 9.806_65;
    pub const WATER_DENSITY_KG_M3: f64 = 1_000.0;
    /// Mass fraction of oxygen in air.
    pub const AIR_OXYGEN_MASS_FRACTION: f64 = 0.232;
    /// Air density at standard conditions (kg/m³).
    pub const AIR_DENSITY_KG_M3: f64 = 1.204;
    /// Raw biogas density at normal conditions (kg/Nm³).
    pub const BIOGAS_DENSITY_KG_NM3: f64 = 1.15;
    /// Methane higher heating value (MJ/Nm³).
    pub const METHANE_HHV_MJ_NM3: f64 = 39.8;

    #[inline]
    pub fn g0() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(G0_MPS2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _q = m3_per_day(1_000.0);
        let _v = m_per_day(40.0);
        let _t = hours(6.0);
        let _d = days(20.0);
        let _l = m(4.0);
        let _p = kw(7.5);
        let _g0 = constants::g0();
    }

    #[test]
    fn clarifier_area_from_overflow_rate() {
        let area = area_for_loading(m3_per_day(4_000.0), m_per_day(40.0));
        assert!((read::square_meters(area) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn basin_volume_from_detention() {
        let vol = volume_for_detention(m3_per_day(2_400.0), hours(6.0));
        assert!((read::cubic_meters(vol) - 600.0).abs() < 1e-9);
    }

    #[test]
    fn pump_power_matches_hand_calc() {
        // 0.1 m3/s through 10 m at 100 % -> 9.81 kW
        let p = pumping_power(m3_per_day(8_640.0), m(10.0), 1.0);
        assert!((read::kilowatts(p) - 9.806_65).abs() < 1e-6);
    }
}
