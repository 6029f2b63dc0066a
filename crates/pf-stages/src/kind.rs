//! Closed set of stage kinds.

use pf_streams::StreamClass;
use serde::{Deserialize, Serialize};

/// One kind of unit operation.
///
/// Liquid-train kinds come first, then the solids/gas pipeline in process order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Preliminary,
    Equalization,
    PrimaryClarifier,
    DissolvedAirFlotation,
    ActivatedSludge,
    MembraneBioreactor,
    TricklingFilter,
    Nitrification,
    Denitrification,
    ChemicalPhosphorus,
    TertiaryFiltration,
    Disinfection,
    Receiving,
    Depackaging,
    Preparation,
    Dilution,
    FeedEqualization,
    Digestion,
    Dewatering,
    LiquidPolishing,
    GasConditioning,
    GasUpgrading,
    GasManagement,
}

impl StageKind {
    pub const ALL: [StageKind; 23] = [
        StageKind::Preliminary,
        StageKind::Equalization,
        StageKind::PrimaryClarifier,
        StageKind::DissolvedAirFlotation,
        StageKind::ActivatedSludge,
        StageKind::MembraneBioreactor,
        StageKind::TricklingFilter,
        StageKind::Nitrification,
        StageKind::Denitrification,
        StageKind::ChemicalPhosphorus,
        StageKind::TertiaryFiltration,
        StageKind::Disinfection,
        StageKind::Receiving,
        StageKind::Depackaging,
        StageKind::Preparation,
        StageKind::Dilution,
        StageKind::FeedEqualization,
        StageKind::Digestion,
        StageKind::Dewatering,
        StageKind::LiquidPolishing,
        StageKind::GasConditioning,
        StageKind::GasUpgrading,
        StageKind::GasManagement,
    ];

    /// Class of stream the stage consumes.
    pub fn input_class(self) -> StreamClass {
        use StageKind::*;
        match self {
            Preliminary | Equalization | PrimaryClarifier | DissolvedAirFlotation
            | ActivatedSludge | MembraneBioreactor | TricklingFilter | Nitrification
            | Denitrification | ChemicalPhosphorus | TertiaryFiltration | Disinfection
            | LiquidPolishing => StreamClass::Liquid,
            Receiving | Depackaging | Preparation | Dilution | FeedEqualization | Digestion
            | Dewatering => StreamClass::Solids,
            GasConditioning | GasUpgrading | GasManagement => StreamClass::Gas,
        }
    }

    /// Liquid stages described by a fractional removal table.
    pub fn uses_removal_table(self) -> bool {
        self.input_class() == StreamClass::Liquid
    }

    /// Secondary-biology stages (exactly one per liquid train).
    pub fn is_secondary(self) -> bool {
        matches!(
            self,
            StageKind::ActivatedSludge | StageKind::MembraneBioreactor | StageKind::TricklingFilter
        )
    }

    pub fn key(self) -> &'static str {
        use StageKind::*;
        match self {
            Preliminary => "preliminary",
            Equalization => "equalization",
            PrimaryClarifier => "primary_clarifier",
            DissolvedAirFlotation => "dissolved_air_flotation",
            ActivatedSludge => "activated_sludge",
            MembraneBioreactor => "membrane_bioreactor",
            TricklingFilter => "trickling_filter",
            Nitrification => "nitrification",
            Denitrification => "denitrification",
            ChemicalPhosphorus => "chemical_phosphorus",
            TertiaryFiltration => "tertiary_filtration",
            Disinfection => "disinfection",
            Receiving => "receiving",
            Depackaging => "depackaging",
            Preparation => "preparation",
            Dilution => "dilution",
            FeedEqualization => "feed_equalization",
            Digestion => "digestion",
            Dewatering => "dewatering",
            LiquidPolishing => "liquid_polishing",
            GasConditioning => "gas_conditioning",
            GasUpgrading => "gas_upgrading",
            GasManagement => "gas_management",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }

    pub fn display_name(self) -> &'static str {
        use StageKind::*;
        match self {
            Preliminary => "Preliminary Treatment",
            Equalization => "Flow Equalization",
            PrimaryClarifier => "Primary Clarifier",
            DissolvedAirFlotation => "Dissolved Air Flotation",
            ActivatedSludge => "Activated Sludge",
            MembraneBioreactor => "Membrane Bioreactor",
            TricklingFilter => "Trickling Filter",
            Nitrification => "Nitrification",
            Denitrification => "Denitrification",
            ChemicalPhosphorus => "Chemical Phosphorus Removal",
            TertiaryFiltration => "Tertiary Filtration",
            Disinfection => "UV Disinfection",
            Receiving => "Feedstock Receiving",
            Depackaging => "Depackaging",
            Preparation => "Feedstock Preparation",
            Dilution => "Dilution Water",
            FeedEqualization => "Feed Equalization",
            Digestion => "Anaerobic Digestion",
            Dewatering => "Digestate Dewatering",
            LiquidPolishing => "Centrate Polishing",
            GasConditioning => "Biogas Conditioning",
            GasUpgrading => "Biogas Upgrading",
            GasManagement => "Emergency Gas Management",
        }
    }

    /// Short tag used to build equipment identifiers.
    pub fn tag(self) -> &'static str {
        use StageKind::*;
        match self {
            Preliminary => "PT",
            Equalization => "EQ",
            PrimaryClarifier => "PC",
            DissolvedAirFlotation => "DAF",
            ActivatedSludge => "AS",
            MembraneBioreactor => "MBR",
            TricklingFilter => "TF",
            Nitrification => "NIT",
            Denitrification => "DN",
            ChemicalPhosphorus => "CP",
            TertiaryFiltration => "TFL",
            Disinfection => "UV",
            Receiving => "RCV",
            Depackaging => "DPK",
            Preparation => "PRP",
            Dilution => "DIL",
            FeedEqualization => "FEQ",
            Digestion => "AD",
            Dewatering => "DW",
            LiquidPolishing => "LP",
            GasConditioning => "GC",
            GasUpgrading => "GU",
            GasManagement => "GM",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
