//! A stage instance within a train.

use crate::criteria::CriteriaSet;
use crate::defaults::{RemovalProfile, StageDesign};
use crate::error::StageResult;
use crate::kind::StageKind;
use crate::transform::transform;
use pf_streams::{Analyte, Stream};
use serde::Serialize;

/// How a stage maps influent to effluent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum TransformProfile {
    /// Fractional removal per analyte.
    Removal(RemovalProfile),
    /// Explicit phase or mass conversion.
    Conversion(String),
}

impl TransformProfile {
    fn for_kind(kind: StageKind, removal: RemovalProfile) -> Self {
        if kind.uses_removal_table() {
            return TransformProfile::Removal(removal);
        }
        let text = match kind {
            StageKind::Depackaging => "wet mass and solids loads reduced by the reject fraction",
            StageKind::Dilution => "dilution water added to reach the target solids content",
            StageKind::Digestion => {
                "VS destroyed = VS x destruction; biogas = VS destroyed x yield"
            }
            StageKind::Dewatering => "cake at target solids with capture; centrate side stream",
            StageKind::GasConditioning => "H2S removed at the design efficiency",
            StageKind::GasUpgrading => "product = CH4 x recovery / purity; tail gas side stream",
            _ => "stream held or conditioned without change",
        };
        TransformProfile::Conversion(text.to_string())
    }
}

/// One unit operation.
///
/// Created unconverged with empty streams; the solver or orchestrator
/// re-evaluates it in place, and it is frozen once the run returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
    pub influent: Stream,
    pub effluent: Stream,
    /// Biogas, centrate or tail gas.
    pub side_stream: Option<Stream>,
    pub profile: TransformProfile,
    pub criteria: CriteriaSet,
    pub notes: Vec<String>,
}

impl Stage {
    pub fn new(kind: StageKind, design: StageDesign) -> Self {
        let class = kind.input_class();
        Self {
            name: kind.display_name().to_string(),
            kind,
            influent: Stream::empty(class),
            effluent: Stream::empty(class),
            side_stream: None,
            profile: TransformProfile::for_kind(kind, design.removal),
            criteria: design.criteria,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn removal(&self) -> Option<&RemovalProfile> {
        match &self.profile {
            TransformProfile::Removal(r) => Some(r),
            TransformProfile::Conversion(_) => None,
        }
    }

    fn design(&self) -> StageDesign {
        StageDesign {
            removal: self.removal().cloned().unwrap_or_default(),
            criteria: self.criteria.clone(),
        }
    }

    /// Re-derive effluent (and side stream) from a new influent.
    pub fn evaluate(&mut self, influent: Stream) -> StageResult<&Stream> {
        let output = transform(self.kind, &influent, &self.design())?;
        tracing::debug!(
            stage = %self.name,
            flow_in = influent.flow(),
            flow_out = output.main.flow(),
            "stage evaluated"
        );
        self.influent = influent;
        self.effluent = output.main;
        self.side_stream = output.side;
        Ok(&self.effluent)
    }

    /// Influent minus effluent mass load (kg/d); zero when either side has no load.
    pub fn removed_load(&self, analyte: Analyte) -> f64 {
        let load_in = self.influent.load_kg_per_day(analyte).unwrap_or(0.0);
        let load_out = self.effluent.load_kg_per_day(analyte).unwrap_or(0.0);
        (load_in - load_out).max(0.0)
    }
}
