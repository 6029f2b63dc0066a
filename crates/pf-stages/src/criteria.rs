//! Design criteria: named numeric parameters with a unit and a cited source.

use crate::error::{StageError, StageResult};
use crate::kind::StageKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! criteria {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        /// Closed set of design-criterion names.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Criterion {
            $($variant),+
        }

        impl Criterion {
            pub const ALL: &'static [Criterion] = &[$(Criterion::$variant),+];

            /// Stable snake_case key, used in override paths.
            pub fn key(self) -> &'static str {
                match self {
                    $(Criterion::$variant => $key),+
                }
            }
        }
    };
}

criteria! {
    PeakFactor => "peak_factor",
    ScreenUnitCapacity => "screen_unit_capacity",
    ScreenBarSpacing => "screen_bar_spacing",
    GritDetentionTime => "grit_detention_time",
    PumpUnitCapacity => "pump_unit_capacity",
    PumpTotalDynamicHead => "pump_total_dynamic_head",
    PumpEfficiency => "pump_efficiency",
    HydraulicRetentionTime => "hydraulic_retention_time",
    MixingPowerDensity => "mixing_power_density",
    SurfaceOverflowRate => "surface_overflow_rate",
    SideWaterDepth => "side_water_depth",
    BasinDepth => "basin_depth",
    MaxUnitDiameter => "max_unit_diameter",
    MaxUnitArea => "max_unit_area",
    MaxUnitVolume => "max_unit_volume",
    SludgeSolidsContent => "sludge_solids_content",
    HydraulicLoadingRate => "hydraulic_loading_rate",
    RecycleRatio => "recycle_ratio",
    SolidsRetentionTime => "solids_retention_time",
    MixedLiquorSuspendedSolids => "mixed_liquor_suspended_solids",
    OxygenDemandFactor => "oxygen_demand_factor",
    NitrogenOxygenDemand => "nitrogen_oxygen_demand",
    OxygenTransferEfficiency => "oxygen_transfer_efficiency",
    AerationSafetyFactor => "aeration_safety_factor",
    BlowerUnitCapacity => "blower_unit_capacity",
    ObservedYield => "observed_yield",
    DesignFlux => "design_flux",
    MembraneScourAir => "membrane_scour_air",
    MembraneUnitArea => "membrane_unit_area",
    OrganicLoadingRate => "organic_loading_rate",
    MediaDepth => "media_depth",
    AlkalinityDemand => "alkalinity_demand",
    CarbonDoseRatio => "carbon_dose_ratio",
    MetalToPhosphorusRatio => "metal_to_phosphorus_ratio",
    SolutionStrength => "solution_strength",
    SolutionDensity => "solution_density",
    StorageDays => "storage_days",
    FilterLoadingRate => "filter_loading_rate",
    BackwashFraction => "backwash_fraction",
    UvDose => "uv_dose",
    UvTransmittance => "uv_transmittance",
    UvBankCapacity => "uv_bank_capacity",
    FeedDensity => "feed_density",
    OperatingHours => "operating_hours",
    UnitThroughput => "unit_throughput",
    RejectFraction => "reject_fraction",
    TargetSolidsContent => "target_solids_content",
    VolatileSolidsDestruction => "volatile_solids_destruction",
    BiogasYield => "biogas_yield",
    MethaneContent => "methane_content",
    HydrogenSulfideContent => "hydrogen_sulfide_content",
    OperatingTemperature => "operating_temperature",
    FeedTemperature => "feed_temperature",
    HeatLossAllowance => "heat_loss_allowance",
    CakeSolidsContent => "cake_solids_content",
    SolidsCapture => "solids_capture",
    PolymerDose => "polymer_dose",
    CentrateAmmonia => "centrate_ammonia",
    H2sRemovalEfficiency => "h2s_removal_efficiency",
    EmptyBedContactTime => "empty_bed_contact_time",
    GasPeakFactor => "gas_peak_factor",
    MethaneRecovery => "methane_recovery",
    ProductMethanePurity => "product_methane_purity",
    UpgraderUnitCapacity => "upgrader_unit_capacity",
    CompressorSpecificPower => "compressor_specific_power",
    FlareCapacityFactor => "flare_capacity_factor",
    GasStorageHours => "gas_storage_hours",
}

/// Source recorded for any value replaced by a run override.
pub const USER_OVERRIDE: &str = "user override";

/// Admissible range of a criterion value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    Positive,
    NonNegative,
    /// Within `[0, 1]`.
    Fraction,
    /// Within `(0, 1]`; used as a divisor.
    PositiveFraction,
    /// Within `(0, 100]`.
    Percent,
    /// Within `(0, 24]`.
    HoursPerDay,
    Any,
}

impl Bounds {
    pub fn admits(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Bounds::Positive => value > 0.0,
            Bounds::NonNegative => value >= 0.0,
            Bounds::Fraction => (0.0..=1.0).contains(&value),
            Bounds::PositiveFraction => value > 0.0 && value <= 1.0,
            Bounds::Percent => value > 0.0 && value <= 100.0,
            Bounds::HoursPerDay => value > 0.0 && value <= 24.0,
            Bounds::Any => true,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Bounds::Positive => "value must be greater than zero",
            Bounds::NonNegative => "value must not be negative",
            Bounds::Fraction => "value must be within [0, 1]",
            Bounds::PositiveFraction => "value must be within (0, 1]",
            Bounds::Percent => "value must be within (0, 100]",
            Bounds::HoursPerDay => "value must be within (0, 24] h/d",
            Bounds::Any => "value must be finite",
        }
    }
}

impl Criterion {
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }

    pub fn bounds(self) -> Bounds {
        use Criterion::*;
        match self {
            PumpEfficiency | OxygenTransferEfficiency | SolutionStrength => Bounds::PositiveFraction,
            RejectFraction | BackwashFraction | VolatileSolidsDestruction | SolidsCapture
            | H2sRemovalEfficiency | MethaneRecovery => Bounds::Fraction,
            MethaneContent | ProductMethanePurity | SludgeSolidsContent | CakeSolidsContent
            | TargetSolidsContent | UvTransmittance => Bounds::Percent,
            OperatingHours => Bounds::HoursPerDay,
            RecycleRatio | HeatLossAllowance | CentrateAmmonia | HydrogenSulfideContent
            | AlkalinityDemand | CarbonDoseRatio | MetalToPhosphorusRatio | PolymerDose
            | ObservedYield | OxygenDemandFactor | NitrogenOxygenDemand => Bounds::NonNegative,
            OperatingTemperature | FeedTemperature => Bounds::Any,
            _ => Bounds::Positive,
        }
    }

    /// Human label derived from the key ("surface_overflow_rate" -> "Surface overflow rate").
    pub fn label(self) -> String {
        let text = self.key().replace('_', " ");
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// One design parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignCriterion {
    pub value: f64,
    pub unit: String,
    /// Citation, e.g. "Metcalf & Eddy 5th ed., Table 5-19".
    pub source: String,
}

impl DesignCriterion {
    pub fn new(value: f64, unit: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            source: source.into(),
        }
    }
}

/// Design criteria of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaSet(BTreeMap<Criterion, DesignCriterion>);

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion, value: f64, unit: &str, source: &str) -> Self {
        self.0
            .insert(criterion, DesignCriterion::new(value, unit, source));
        self
    }

    pub fn get(&self, criterion: Criterion) -> Option<&DesignCriterion> {
        self.0.get(&criterion)
    }

    pub fn contains(&self, criterion: Criterion) -> bool {
        self.0.contains_key(&criterion)
    }

    pub fn insert(&mut self, criterion: Criterion, design: DesignCriterion) {
        self.0.insert(criterion, design);
    }

    /// Replace a value in place, marking the source as a user override.
    ///
    /// Returns false when the stage has no such criterion.
    pub fn set_value(&mut self, criterion: Criterion, value: f64) -> bool {
        match self.0.get_mut(&criterion) {
            Some(design) => {
                design.value = value;
                design.source = USER_OVERRIDE.to_string();
                true
            }
            None => false,
        }
    }

    /// Value of a required criterion.
    pub fn value(&self, stage: StageKind, criterion: Criterion) -> StageResult<f64> {
        self.get(criterion)
            .map(|d| d.value)
            .ok_or(StageError::MissingCriterion { stage, criterion })
    }

    /// Design-basis text for a criterion, e.g. "Surface overflow rate 40 m3/m2/d (M&E ...)".
    pub fn basis(&self, criterion: Criterion) -> String {
        match self.get(criterion) {
            Some(d) => format!("{} {} {} ({})", criterion.label(), d.value, d.unit, d.source),
            None => criterion.label(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, &DesignCriterion)> {
        self.0.iter().map(|(c, d)| (*c, d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for c in Criterion::ALL {
            assert_eq!(Criterion::from_key(c.key()), Some(*c));
        }
    }

    #[test]
    fn label_from_key() {
        assert_eq!(Criterion::SurfaceOverflowRate.label(), "Surface overflow rate");
        assert_eq!(Criterion::UvDose.label(), "Uv dose");
    }

    #[test]
    fn missing_criterion_is_an_error() {
        let set = CriteriaSet::new().with(Criterion::SideWaterDepth, 4.0, "m", "test");
        assert_eq!(
            set.value(StageKind::PrimaryClarifier, Criterion::SideWaterDepth),
            Ok(4.0)
        );
        assert!(matches!(
            set.value(StageKind::PrimaryClarifier, Criterion::SurfaceOverflowRate),
            Err(StageError::MissingCriterion { .. })
        ));
    }

    #[test]
    fn override_marks_source() {
        let mut set = CriteriaSet::new().with(Criterion::SideWaterDepth, 4.0, "m", "M&E");
        assert!(set.set_value(Criterion::SideWaterDepth, 5.0));
        let d = set.get(Criterion::SideWaterDepth).unwrap();
        assert_eq!(d.value, 5.0);
        assert_eq!(d.source, "user override");
        assert!(!set.set_value(Criterion::UvDose, 40.0));
    }

    #[test]
    fn bounds_reject_zero_where_it_divides() {
        assert!(!Criterion::SurfaceOverflowRate.bounds().admits(0.0));
        assert!(!Criterion::SideWaterDepth.bounds().admits(-1.0));
        assert!(!Criterion::PumpEfficiency.bounds().admits(0.0));
        assert!(Criterion::RecycleRatio.bounds().admits(0.0));
        assert!(Criterion::FeedTemperature.bounds().admits(-2.0));
        assert!(!Criterion::OperatingHours.bounds().admits(25.0));
        assert!(!Criterion::MethaneContent.bounds().admits(120.0));
        assert!(!Criterion::FeedTemperature.bounds().admits(f64::NAN));
    }

    #[test]
    fn basis_mentions_value_unit_and_source() {
        let set = CriteriaSet::new().with(Criterion::UvDose, 40.0, "mJ/cm2", "NWRI 2012");
        let text = set.basis(Criterion::UvDose);
        assert!(text.contains("40"));
        assert!(text.contains("mJ/cm2"));
        assert!(text.contains("NWRI"));
    }
}
