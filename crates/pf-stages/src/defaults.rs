//! Built-in removal-efficiency and design-criteria tables.
//!
//! Every value carries a citation. The whole table is serde-serialisable so a
//! calibration file can replace it wholesale.

use crate::criteria::{CriteriaSet, Criterion, USER_OVERRIDE};
use crate::error::{StageError, StageResult};
use crate::kind::StageKind;
use crate::overrides::FieldPath;
use pf_streams::Analyte;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ME: &str = "Metcalf & Eddy 5th ed.";
const MOP8: &str = "WEF MOP 8 Design of WRRFs";
const MOP16: &str = "WEF MOP 16 Design of Municipal Wastewater Treatment Plants";
const TEN_STATES: &str = "Ten States Standards (2014)";
const NWRI: &str = "NWRI UV Disinfection Guidelines (2012)";
const EPA_BIOGAS: &str = "EPA AgSTAR / LMOP biogas guidance";
const VENDOR: &str = "typical manufacturer rating";

/// One removal fraction and where it comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalEfficiency {
    pub fraction: f64,
    pub source: String,
}

/// Fractional removal per analyte, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemovalProfile(BTreeMap<Analyte, RemovalEfficiency>);

impl RemovalProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile whose every efficiency cites `source`.
    pub fn cited(source: &str, pairs: &[(Analyte, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(a, e)| {
                    let entry = RemovalEfficiency {
                        fraction: *e,
                        source: source.to_string(),
                    };
                    (*a, entry)
                })
                .collect(),
        )
    }

    /// Efficiency for an analyte; `None` means the stage passes it through.
    pub fn efficiency(&self, analyte: Analyte) -> Option<f64> {
        self.0.get(&analyte).map(|r| r.fraction)
    }

    pub fn source(&self, analyte: Analyte) -> Option<&str> {
        self.0.get(&analyte).map(|r| r.source.as_str())
    }

    /// Replace one efficiency, marking its source as a user override.
    pub fn set(&mut self, analyte: Analyte, efficiency: f64) {
        self.0.insert(
            analyte,
            RemovalEfficiency {
                fraction: efficiency,
                source: USER_OVERRIDE.to_string(),
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (Analyte, f64)> + '_ {
        self.0.iter().map(|(a, r)| (*a, r.fraction))
    }

    pub fn entries(&self) -> impl Iterator<Item = (Analyte, &RemovalEfficiency)> {
        self.0.iter().map(|(a, r)| (*a, r))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Removal profile and design criteria for one stage instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDesign {
    #[serde(default)]
    pub removal: RemovalProfile,
    #[serde(default)]
    pub criteria: CriteriaSet,
}

/// Default tables keyed by stage kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTables {
    #[serde(default)]
    pub removal: BTreeMap<StageKind, RemovalProfile>,
    #[serde(default)]
    pub criteria: BTreeMap<StageKind, CriteriaSet>,
}

impl Default for DefaultTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl DefaultTables {
    /// Textbook defaults for every stage kind.
    pub fn standard() -> Self {
        Self {
            removal: standard_removal(),
            criteria: standard_criteria(),
        }
    }

    /// Design for a stage kind; kinds without table entries get an empty design.
    pub fn design_for(&self, kind: StageKind) -> StageDesign {
        StageDesign {
            removal: self.removal.get(&kind).cloned().unwrap_or_default(),
            criteria: self.criteria.get(&kind).cloned().unwrap_or_default(),
        }
    }

    /// Replace exactly the addressed criterion or removal efficiency.
    ///
    /// Threshold and solver paths are not handled here.
    pub fn apply_override(&mut self, path: &FieldPath, value: f64) -> StageResult<()> {
        if !value.is_finite() {
            return Err(StageError::InvalidOverride {
                path: path.to_string(),
                value,
                reason: "value must be finite",
            });
        }
        match path {
            FieldPath::Criterion { stage, criterion } => {
                let bounds = criterion.bounds();
                if !bounds.admits(value) {
                    return Err(StageError::InvalidOverride {
                        path: path.to_string(),
                        value,
                        reason: bounds.describe(),
                    });
                }
                let applied = self
                    .criteria
                    .get_mut(stage)
                    .map(|set| set.set_value(*criterion, value))
                    .unwrap_or(false);
                if applied {
                    Ok(())
                } else {
                    Err(StageError::UnknownFieldPath {
                        path: path.to_string(),
                    })
                }
            }
            FieldPath::Removal { stage, analyte } => {
                if !stage.uses_removal_table() {
                    return Err(StageError::UnknownFieldPath {
                        path: path.to_string(),
                    });
                }
                if !(0.0..=1.0).contains(&value) {
                    return Err(StageError::InvalidOverride {
                        path: path.to_string(),
                        value,
                        reason: "removal efficiency must be within [0, 1]",
                    });
                }
                self.removal.entry(*stage).or_default().set(*analyte, value);
                Ok(())
            }
            FieldPath::Threshold(_) | FieldPath::Solver(_) => Err(StageError::UnknownFieldPath {
                path: path.to_string(),
            }),
        }
    }
}

fn standard_removal() -> BTreeMap<StageKind, RemovalProfile> {
    use Analyte::*;
    use StageKind as K;

    let mut t = BTreeMap::new();
    t.insert(K::Preliminary, RemovalProfile::cited(ME, &[(Tss, 0.05)]));
    t.insert(K::Equalization, RemovalProfile::new());
    t.insert(
        K::PrimaryClarifier,
        RemovalProfile::cited(ME, &[
            (Bod, 0.30),
            (Cod, 0.30),
            (Tss, 0.60),
            (Vss, 0.60),
            (Fog, 0.50),
            (Tkn, 0.10),
            (TotalNitrogen, 0.10),
            (TotalPhosphorus, 0.10),
        ]),
    );
    t.insert(
        K::DissolvedAirFlotation,
        RemovalProfile::cited(MOP8, &[(Fog, 0.90), (Tss, 0.85), (Vss, 0.85), (Bod, 0.40), (Cod, 0.40)]),
    );
    t.insert(
        K::ActivatedSludge,
        RemovalProfile::cited(ME, &[
            (Bod, 0.90),
            (Cod, 0.85),
            (Tss, 0.90),
            (Vss, 0.90),
            (Ammonia, 0.20),
            (Tkn, 0.20),
            (TotalNitrogen, 0.20),
            (TotalPhosphorus, 0.25),
            (Fog, 0.90),
        ]),
    );
    t.insert(
        K::MembraneBioreactor,
        RemovalProfile::cited(MOP8, &[
            (Bod, 0.97),
            (Cod, 0.92),
            (Tss, 0.99),
            (Vss, 0.99),
            (Ammonia, 0.90),
            (Tkn, 0.85),
            (TotalNitrogen, 0.30),
            (TotalPhosphorus, 0.30),
            (Fog, 0.95),
        ]),
    );
    t.insert(
        K::TricklingFilter,
        RemovalProfile::cited(ME, &[
            (Bod, 0.80),
            (Cod, 0.75),
            (Tss, 0.80),
            (Vss, 0.80),
            (Ammonia, 0.10),
            (Tkn, 0.10),
            (TotalNitrogen, 0.10),
        ]),
    );
    t.insert(
        K::Nitrification,
        RemovalProfile::cited(ME, &[(Ammonia, 0.90), (Tkn, 0.85), (Bod, 0.30)]),
    );
    t.insert(
        K::Denitrification,
        RemovalProfile::cited(ME, &[(Nitrate, 0.85), (TotalNitrogen, 0.70), (Bod, 0.10)]),
    );
    t.insert(
        K::ChemicalPhosphorus,
        RemovalProfile::cited(ME, &[(TotalPhosphorus, 0.85), (Bod, 0.05)]),
    );
    t.insert(
        K::TertiaryFiltration,
        RemovalProfile::cited(ME, &[
            (Tss, 0.70),
            (Vss, 0.70),
            (Bod, 0.40),
            (Cod, 0.20),
            (TotalPhosphorus, 0.30),
        ]),
    );
    t.insert(K::Disinfection, RemovalProfile::new());
    t.insert(
        K::LiquidPolishing,
        RemovalProfile::cited(MOP16, &[
            (Tss, 0.85),
            (Vss, 0.85),
            (Bod, 0.85),
            (Cod, 0.70),
            (Ammonia, 0.80),
            (Tkn, 0.80),
        ]),
    );
    t
}

fn standard_criteria() -> BTreeMap<StageKind, CriteriaSet> {
    use Criterion as C;
    use StageKind as K;

    let pumps = |set: CriteriaSet, capacity: f64, head: f64| {
        set.with(C::PumpUnitCapacity, capacity, "m3/d", VENDOR)
            .with(C::PumpTotalDynamicHead, head, "m", MOP8)
            .with(C::PumpEfficiency, 0.70, "-", "Hydraulic Institute wire-to-water")
    };

    let mut t = BTreeMap::new();

    t.insert(
        K::Preliminary,
        pumps(CriteriaSet::new(), 15_000.0, 12.0)
            .with(C::PeakFactor, 2.5, "-", TEN_STATES)
            .with(C::ScreenUnitCapacity, 20_000.0, "m3/d", VENDOR)
            .with(C::ScreenBarSpacing, 6.0, "mm", ME)
            .with(C::GritDetentionTime, 3.0, "min", ME),
    );
    t.insert(
        K::Equalization,
        CriteriaSet::new()
            .with(C::HydraulicRetentionTime, 6.0, "h", ME)
            .with(C::MixingPowerDensity, 5.0, "W/m3", ME)
            .with(C::BasinDepth, 5.0, "m", MOP8),
    );
    t.insert(
        K::PrimaryClarifier,
        pumps(CriteriaSet::new(), 2_000.0, 10.0)
            .with(C::SurfaceOverflowRate, 40.0, "m3/m2/d", ME)
            .with(C::SideWaterDepth, 4.0, "m", ME)
            .with(C::MaxUnitDiameter, 40.0, "m", TEN_STATES)
            .with(C::SludgeSolidsContent, 4.0, "%", ME),
    );
    t.insert(
        K::DissolvedAirFlotation,
        pumps(CriteriaSet::new(), 5_000.0, 50.0)
            .with(C::HydraulicLoadingRate, 5.0, "m3/m2/h", MOP8)
            .with(C::RecycleRatio, 0.30, "-", MOP8)
            .with(C::MaxUnitArea, 60.0, "m2", VENDOR)
            .with(C::SludgeSolidsContent, 4.0, "%", MOP8),
    );
    t.insert(
        K::ActivatedSludge,
        pumps(CriteriaSet::new(), 10_000.0, 6.0)
            .with(C::HydraulicRetentionTime, 6.0, "h", ME)
            .with(C::BasinDepth, 5.0, "m", MOP8)
            .with(C::SolidsRetentionTime, 10.0, "d", ME)
            .with(C::MixedLiquorSuspendedSolids, 3_000.0, "mg/L", ME)
            .with(C::RecycleRatio, 0.75, "-", ME)
            .with(C::OxygenDemandFactor, 1.1, "kg O2/kg BOD", ME)
            .with(C::OxygenTransferEfficiency, 0.20, "-", MOP8)
            .with(C::AerationSafetyFactor, 1.5, "-", MOP8)
            .with(C::BlowerUnitCapacity, 60.0, "m3/min", VENDOR)
            .with(C::ObservedYield, 0.6, "kg TSS/kg BOD", ME)
            .with(C::SurfaceOverflowRate, 24.0, "m3/m2/d", ME)
            .with(C::SideWaterDepth, 4.5, "m", TEN_STATES)
            .with(C::MaxUnitDiameter, 40.0, "m", TEN_STATES),
    );
    t.insert(
        K::MembraneBioreactor,
        pumps(CriteriaSet::new(), 10_000.0, 8.0)
            .with(C::HydraulicRetentionTime, 6.0, "h", MOP8)
            .with(C::BasinDepth, 5.0, "m", MOP8)
            .with(C::MixedLiquorSuspendedSolids, 8_000.0, "mg/L", MOP8)
            .with(C::RecycleRatio, 4.0, "-", MOP8)
            .with(C::DesignFlux, 20.0, "L/m2/h", MOP8)
            .with(C::MembraneScourAir, 0.3, "Nm3/m2/h", MOP8)
            .with(C::MembraneUnitArea, 500.0, "m2", VENDOR)
            .with(C::OxygenDemandFactor, 1.1, "kg O2/kg BOD", ME)
            .with(C::OxygenTransferEfficiency, 0.15, "-", MOP8)
            .with(C::AerationSafetyFactor, 1.5, "-", MOP8)
            .with(C::BlowerUnitCapacity, 60.0, "m3/min", VENDOR)
            .with(C::ObservedYield, 0.4, "kg TSS/kg BOD", ME),
    );
    t.insert(
        K::TricklingFilter,
        pumps(CriteriaSet::new(), 15_000.0, 10.0)
            .with(C::OrganicLoadingRate, 0.5, "kg BOD/m3/d", ME)
            .with(C::MediaDepth, 6.0, "m", ME)
            .with(C::RecycleRatio, 1.0, "-", ME)
            .with(C::ObservedYield, 0.5, "kg TSS/kg BOD", ME)
            .with(C::SurfaceOverflowRate, 24.0, "m3/m2/d", ME)
            .with(C::SideWaterDepth, 4.0, "m", TEN_STATES)
            .with(C::MaxUnitDiameter, 40.0, "m", TEN_STATES),
    );
    t.insert(
        K::Nitrification,
        CriteriaSet::new()
            .with(C::HydraulicRetentionTime, 6.0, "h", ME)
            .with(C::BasinDepth, 5.0, "m", MOP8)
            .with(C::NitrogenOxygenDemand, 4.57, "kg O2/kg N", ME)
            .with(C::OxygenDemandFactor, 1.1, "kg O2/kg BOD", ME)
            .with(C::OxygenTransferEfficiency, 0.20, "-", MOP8)
            .with(C::AerationSafetyFactor, 1.5, "-", MOP8)
            .with(C::BlowerUnitCapacity, 60.0, "m3/min", VENDOR)
            .with(C::AlkalinityDemand, 7.14, "kg CaCO3/kg N", ME),
    );
    t.insert(
        K::Denitrification,
        pumps(CriteriaSet::new(), 20_000.0, 3.0)
            .with(C::HydraulicRetentionTime, 3.0, "h", ME)
            .with(C::BasinDepth, 5.0, "m", MOP8)
            .with(C::RecycleRatio, 3.0, "-", ME)
            .with(C::MixingPowerDensity, 8.0, "W/m3", ME)
            .with(C::CarbonDoseRatio, 3.0, "kg methanol/kg NO3-N", ME)
            .with(C::StorageDays, 15.0, "d", TEN_STATES),
    );
    t.insert(
        K::ChemicalPhosphorus,
        CriteriaSet::new()
            .with(C::MetalToPhosphorusRatio, 1.5, "mol Fe/mol P", ME)
            .with(C::SolutionStrength, 0.40, "-", "ferric chloride supply grade")
            .with(C::SolutionDensity, 1.42, "kg/L", "ferric chloride supply grade")
            .with(C::StorageDays, 15.0, "d", TEN_STATES),
    );
    t.insert(
        K::TertiaryFiltration,
        pumps(CriteriaSet::new(), 5_000.0, 8.0)
            .with(C::FilterLoadingRate, 10.0, "m3/m2/h", ME)
            .with(C::BackwashFraction, 0.03, "-", ME)
            .with(C::MaxUnitArea, 50.0, "m2", VENDOR),
    );
    t.insert(
        K::Disinfection,
        CriteriaSet::new()
            .with(C::UvDose, 40.0, "mJ/cm2", NWRI)
            .with(C::UvTransmittance, 65.0, "%", NWRI)
            .with(C::UvBankCapacity, 8_000.0, "m3/d", VENDOR)
            .with(C::PeakFactor, 2.5, "-", TEN_STATES),
    );
    t.insert(
        K::Receiving,
        pumps(CriteriaSet::new(), 1_200.0, 15.0)
            .with(C::StorageDays, 2.0, "d", MOP16)
            .with(C::FeedDensity, 1_000.0, "kg/m3", MOP16)
            .with(C::OperatingHours, 10.0, "h/d", MOP16),
    );
    t.insert(
        K::Depackaging,
        CriteriaSet::new()
            .with(C::UnitThroughput, 10.0, "t/h", VENDOR)
            .with(C::OperatingHours, 8.0, "h/d", VENDOR)
            .with(C::RejectFraction, 0.15, "-", VENDOR),
    );
    t.insert(
        K::Preparation,
        CriteriaSet::new()
            .with(C::UnitThroughput, 30.0, "m3/h", VENDOR)
            .with(C::OperatingHours, 16.0, "h/d", MOP16)
            .with(C::HydraulicRetentionTime, 12.0, "h", MOP16)
            .with(C::MixingPowerDensity, 8.0, "W/m3", MOP8)
            .with(C::FeedDensity, 1_000.0, "kg/m3", MOP16),
    );
    t.insert(
        K::Dilution,
        pumps(CriteriaSet::new(), 500.0, 20.0)
            .with(C::TargetSolidsContent, 12.0, "%", MOP8),
    );
    t.insert(
        K::FeedEqualization,
        pumps(CriteriaSet::new(), 1_200.0, 15.0)
            .with(C::StorageDays, 3.0, "d", MOP8)
            .with(C::MixingPowerDensity, 6.0, "W/m3", MOP8)
            .with(C::FeedDensity, 1_000.0, "kg/m3", MOP16),
    );
    t.insert(
        K::Digestion,
        CriteriaSet::new()
            .with(C::HydraulicRetentionTime, 25.0, "d", MOP8)
            .with(C::OrganicLoadingRate, 3.0, "kg VS/m3/d", MOP8)
            .with(C::VolatileSolidsDestruction, 0.60, "-", MOP8)
            .with(C::BiogasYield, 0.9, "Nm3/kg VS destroyed", MOP8)
            .with(C::MethaneContent, 62.0, "%", MOP8)
            .with(C::HydrogenSulfideContent, 1_500.0, "ppmv", EPA_BIOGAS)
            .with(C::OperatingTemperature, 37.0, "degC", MOP8)
            .with(C::FeedTemperature, 15.0, "degC", MOP8)
            .with(C::HeatLossAllowance, 0.25, "-", ME)
            .with(C::MaxUnitVolume, 6_000.0, "m3", MOP8)
            .with(C::MixingPowerDensity, 6.0, "W/m3", MOP8)
            .with(C::FeedDensity, 1_000.0, "kg/m3", MOP16),
    );
    t.insert(
        K::Dewatering,
        CriteriaSet::new()
            .with(C::CakeSolidsContent, 22.0, "%", ME)
            .with(C::SolidsCapture, 0.95, "-", ME)
            .with(C::PolymerDose, 8.0, "kg/t DS", ME)
            .with(C::OperatingHours, 16.0, "h/d", MOP8)
            .with(C::UnitThroughput, 25.0, "m3/h", VENDOR)
            .with(C::CentrateAmmonia, 1_000.0, "mg/L", ME),
    );
    t.insert(
        K::LiquidPolishing,
        pumps(CriteriaSet::new(), 500.0, 8.0)
            .with(C::HydraulicRetentionTime, 24.0, "h", ME)
            .with(C::BasinDepth, 5.0, "m", MOP8)
            .with(C::OxygenDemandFactor, 1.1, "kg O2/kg BOD", ME)
            .with(C::NitrogenOxygenDemand, 4.57, "kg O2/kg N", ME)
            .with(C::OxygenTransferEfficiency, 0.20, "-", MOP8)
            .with(C::AerationSafetyFactor, 1.5, "-", MOP8)
            .with(C::BlowerUnitCapacity, 30.0, "m3/min", VENDOR),
    );
    t.insert(
        K::GasConditioning,
        CriteriaSet::new()
            .with(C::H2sRemovalEfficiency, 0.99, "-", EPA_BIOGAS)
            .with(C::EmptyBedContactTime, 3.0, "min", EPA_BIOGAS)
            .with(C::GasPeakFactor, 1.25, "-", EPA_BIOGAS)
            .with(C::BlowerUnitCapacity, 1_000.0, "Nm3/h", VENDOR),
    );
    t.insert(
        K::GasUpgrading,
        CriteriaSet::new()
            .with(C::MethaneRecovery, 0.97, "-", EPA_BIOGAS)
            .with(C::ProductMethanePurity, 96.0, "%", EPA_BIOGAS)
            .with(C::UpgraderUnitCapacity, 1_200.0, "Nm3/h", VENDOR)
            .with(C::CompressorSpecificPower, 0.25, "kWh/Nm3", EPA_BIOGAS)
            .with(C::GasPeakFactor, 1.25, "-", EPA_BIOGAS),
    );
    t.insert(
        K::GasManagement,
        CriteriaSet::new()
            .with(C::FlareCapacityFactor, 1.25, "-", EPA_BIOGAS)
            .with(C::GasStorageHours, 4.0, "h", MOP8),
    );
    t
}
