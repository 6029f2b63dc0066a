//! Analyte and stream-class definitions.

use crate::units::FlowUnit;
use serde::{Deserialize, Serialize};

/// Physical phase of a stream; decides its canonical flow unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamClass {
    Liquid,
    Gas,
    Solids,
}

impl StreamClass {
    pub fn canonical_unit(self) -> FlowUnit {
        match self {
            StreamClass::Liquid => FlowUnit::M3PerDay,
            StreamClass::Gas => FlowUnit::Nm3PerDay,
            StreamClass::Solids => FlowUnit::KgPerDay,
        }
    }
}

/// Closed set of tracked constituents.
///
/// Every analyte belongs to exactly one stream class and carries one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyte {
    /// Biochemical oxygen demand, 5-day (mg/L)
    Bod,
    /// Chemical oxygen demand (mg/L)
    Cod,
    /// Total suspended solids (mg/L)
    Tss,
    /// Volatile suspended solids (mg/L)
    Vss,
    /// Total Kjeldahl nitrogen (mg/L)
    Tkn,
    /// Ammonia nitrogen, NH₃-N (mg/L)
    Ammonia,
    /// Nitrate nitrogen, NO₃-N (mg/L)
    Nitrate,
    /// Total nitrogen (mg/L)
    TotalNitrogen,
    /// Total phosphorus (mg/L)
    TotalPhosphorus,
    /// Fats, oils and grease (mg/L)
    Fog,
    /// Methane, CH₄ (vol %)
    Methane,
    /// Carbon dioxide, CO₂ (vol %)
    CarbonDioxide,
    /// Nitrogen gas, N₂ (vol %)
    Nitrogen,
    /// Oxygen, O₂ (vol %)
    Oxygen,
    /// Hydrogen sulfide, H₂S (ppmv)
    HydrogenSulfide,
    /// Total solids (kg/d)
    TotalSolids,
    /// Volatile solids (kg/d)
    VolatileSolids,
    /// Carbon to nitrogen ratio (-)
    CarbonNitrogenRatio,
}

impl Analyte {
    pub const ALL: [Analyte; 18] = [
        Analyte::Bod,
        Analyte::Cod,
        Analyte::Tss,
        Analyte::Vss,
        Analyte::Tkn,
        Analyte::Ammonia,
        Analyte::Nitrate,
        Analyte::TotalNitrogen,
        Analyte::TotalPhosphorus,
        Analyte::Fog,
        Analyte::Methane,
        Analyte::CarbonDioxide,
        Analyte::Nitrogen,
        Analyte::Oxygen,
        Analyte::HydrogenSulfide,
        Analyte::TotalSolids,
        Analyte::VolatileSolids,
        Analyte::CarbonNitrogenRatio,
    ];

    pub fn class(self) -> StreamClass {
        match self {
            Analyte::Bod
            | Analyte::Cod
            | Analyte::Tss
            | Analyte::Vss
            | Analyte::Tkn
            | Analyte::Ammonia
            | Analyte::Nitrate
            | Analyte::TotalNitrogen
            | Analyte::TotalPhosphorus
            | Analyte::Fog => StreamClass::Liquid,
            Analyte::Methane
            | Analyte::CarbonDioxide
            | Analyte::Nitrogen
            | Analyte::Oxygen
            | Analyte::HydrogenSulfide => StreamClass::Gas,
            Analyte::TotalSolids | Analyte::VolatileSolids | Analyte::CarbonNitrogenRatio => {
                StreamClass::Solids
            }
        }
    }

    pub fn unit(self) -> &'static str {
        match self.class() {
            StreamClass::Liquid => "mg/L",
            StreamClass::Gas => {
                if self == Analyte::HydrogenSulfide {
                    "ppmv"
                } else {
                    "%"
                }
            }
            StreamClass::Solids => {
                if self == Analyte::CarbonNitrogenRatio {
                    "-"
                } else {
                    "kg/d"
                }
            }
        }
    }

    /// True for gas species reported as volume percent (they must sum to ≤ 100 %).
    pub fn is_gas_percent(self) -> bool {
        self.class() == StreamClass::Gas && self != Analyte::HydrogenSulfide
    }

    /// True for solids entries that are mass loads (summed when blending).
    pub fn is_solids_load(self) -> bool {
        matches!(self, Analyte::TotalSolids | Analyte::VolatileSolids)
    }

    /// Stable snake_case key, used in override paths and reports.
    pub fn key(self) -> &'static str {
        match self {
            Analyte::Bod => "bod",
            Analyte::Cod => "cod",
            Analyte::Tss => "tss",
            Analyte::Vss => "vss",
            Analyte::Tkn => "tkn",
            Analyte::Ammonia => "ammonia",
            Analyte::Nitrate => "nitrate",
            Analyte::TotalNitrogen => "total_nitrogen",
            Analyte::TotalPhosphorus => "total_phosphorus",
            Analyte::Fog => "fog",
            Analyte::Methane => "methane",
            Analyte::CarbonDioxide => "carbon_dioxide",
            Analyte::Nitrogen => "nitrogen",
            Analyte::Oxygen => "oxygen",
            Analyte::HydrogenSulfide => "hydrogen_sulfide",
            Analyte::TotalSolids => "total_solids",
            Analyte::VolatileSolids => "volatile_solids",
            Analyte::CarbonNitrogenRatio => "carbon_nitrogen_ratio",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.key() == key)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Analyte::Bod => "BOD5",
            Analyte::Cod => "COD",
            Analyte::Tss => "TSS",
            Analyte::Vss => "VSS",
            Analyte::Tkn => "TKN",
            Analyte::Ammonia => "NH3-N",
            Analyte::Nitrate => "NO3-N",
            Analyte::TotalNitrogen => "Total Nitrogen",
            Analyte::TotalPhosphorus => "Total Phosphorus",
            Analyte::Fog => "FOG",
            Analyte::Methane => "CH4",
            Analyte::CarbonDioxide => "CO2",
            Analyte::Nitrogen => "N2",
            Analyte::Oxygen => "O2",
            Analyte::HydrogenSulfide => "H2S",
            Analyte::TotalSolids => "Total Solids",
            Analyte::VolatileSolids => "Volatile Solids",
            Analyte::CarbonNitrogenRatio => "C:N Ratio",
        }
    }

    /// Map a free-form parameter name ("BOD5", "NH3-N", "Oil & Grease", "C:N") to an analyte.
    ///
    /// Returns `None` for names that belong in a stream's additional bucket.
    pub fn from_label(label: &str) -> Option<Self> {
        let norm: String = label
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        if norm.is_empty() {
            return None;
        }

        let has = |needle: &str| norm.contains(needle);
        let is = |exact: &str| norm == exact;

        // ordered: compound names before the words they contain
        if is("cn") || has("cnratio") || has("carbontonitrogen") || has("carbonnitrogen") {
            Some(Analyte::CarbonNitrogenRatio)
        } else if has("tkn") || has("kjeldahl") {
            Some(Analyte::Tkn)
        } else if has("nh3") || has("nh4") || has("ammon") {
            Some(Analyte::Ammonia)
        } else if has("no3") || has("nitrate") || is("nox") {
            Some(Analyte::Nitrate)
        } else if has("totalnitrogen") || is("tn") {
            Some(Analyte::TotalNitrogen)
        } else if has("phosph") || is("tp") {
            Some(Analyte::TotalPhosphorus)
        } else if has("vss") || has("volatilesuspended") {
            Some(Analyte::Vss)
        } else if has("tss") || has("suspendedsolids") {
            Some(Analyte::Tss)
        } else if has("volatilesolids") || is("vs") || is("vsts") {
            Some(Analyte::VolatileSolids)
        } else if has("totalsolids") || has("drysolids") || has("solidscontent") || is("ts") {
            Some(Analyte::TotalSolids)
        } else if has("bod") || has("biochemicaloxygen") {
            Some(Analyte::Bod)
        } else if has("cod") || has("chemicaloxygen") {
            Some(Analyte::Cod)
        } else if has("fog") || has("grease") || has("oil") {
            Some(Analyte::Fog)
        } else if has("methane") || has("ch4") {
            Some(Analyte::Methane)
        } else if has("co2") || has("carbondioxide") {
            Some(Analyte::CarbonDioxide)
        } else if has("h2s") || has("hydrogensulfide") || has("hydrogensulphide") {
            Some(Analyte::HydrogenSulfide)
        } else if is("o2") || is("oxygen") {
            Some(Analyte::Oxygen)
        } else if is("n2") || has("nitrogengas") {
            Some(Analyte::Nitrogen)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Analyte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
