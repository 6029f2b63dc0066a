//! pf-sizing: equipment sizing catalog.
//!
//! Converts converged stages into discrete, quantified [`EquipmentItem`]s.
//! Every function is pure with respect to the stage's streams and design
//! criteria. Spec values are rounded to an equipment-appropriate precision,
//! checked to be finite and non-negative, and every item names its governing
//! criterion in its design basis.
//!
//! Redundancy policy:
//! - screens, grit units, pumps, blowers, compressors, macerators,
//!   centrifuges and UV banks are installed duty + standby (quantity ≥ 2)
//! - depackagers, emergency flares and gas holders follow a documented
//!   single-unit policy
//!
//! # Example
//!
//! ```
//! use pf_sizing::{IdAllocator, size_stage};
//! use pf_stages::{DefaultTables, Stage, StageKind};
//! use pf_streams::{Analyte, Stream};
//!
//! let tables = DefaultTables::standard();
//! let mut stage = Stage::new(StageKind::Preliminary, tables.design_for(StageKind::Preliminary));
//! stage.evaluate(Stream::liquid(4_000.0).unwrap()).unwrap();
//!
//! let mut ids = IdAllocator::new();
//! let items = size_stage(&stage, &mut ids).unwrap();
//! assert!(items.iter().all(|i| !i.design_basis.is_empty()));
//! ```

pub mod common;
pub mod equipment;
pub mod error;
pub mod gas;
pub mod liquid;
pub mod nutrients;
pub mod solids;

pub use common::IdAllocator;
pub use equipment::{EquipmentItem, Redundancy, SpecValue};
pub use error::{SizingError, SizingResult};

use pf_stages::{Stage, StageKind};

/// Size one converged stage.
///
/// Stages with no flow produce no equipment.
pub fn size_stage(stage: &Stage, ids: &mut IdAllocator) -> SizingResult<Vec<EquipmentItem>> {
    if stage.influent.is_empty_flow() {
        tracing::debug!(stage = %stage.name, "no flow; nothing to size");
        return Ok(Vec::new());
    }
    use StageKind::*;
    let items = match stage.kind {
        Preliminary => liquid::preliminary(stage, ids)?,
        Equalization => liquid::equalization(stage, ids)?,
        PrimaryClarifier => liquid::primary_clarifier(stage, ids)?,
        DissolvedAirFlotation => liquid::flotation(stage, ids)?,
        ActivatedSludge => liquid::activated_sludge(stage, ids)?,
        MembraneBioreactor => liquid::membrane_bioreactor(stage, ids)?,
        TricklingFilter => liquid::trickling_filter(stage, ids)?,
        Nitrification => nutrients::nitrification(stage, ids)?,
        Denitrification => nutrients::denitrification(stage, ids)?,
        ChemicalPhosphorus => nutrients::chemical_phosphorus(stage, ids)?,
        TertiaryFiltration => nutrients::tertiary_filtration(stage, ids)?,
        Disinfection => nutrients::disinfection(stage, ids)?,
        Receiving => solids::receiving(stage, ids)?,
        Depackaging => solids::depackaging(stage, ids)?,
        Preparation => solids::preparation(stage, ids)?,
        Dilution => solids::dilution(stage, ids)?,
        FeedEqualization => solids::feed_equalization(stage, ids)?,
        Digestion => solids::digestion(stage, ids)?,
        Dewatering => solids::dewatering(stage, ids)?,
        LiquidPolishing => nutrients::liquid_polishing(stage, ids)?,
        GasConditioning => gas::conditioning(stage, ids)?,
        GasUpgrading => gas::upgrading(stage, ids)?,
        GasManagement => gas::management(stage, ids)?,
    };
    for item in &items {
        check_specs(item)?;
    }
    Ok(items)
}

fn check_specs(item: &EquipmentItem) -> SizingResult<()> {
    for (name, spec) in &item.specs {
        if !(spec.value.is_finite() && spec.value >= 0.0) {
            return Err(SizingError::NonPhysicalSpec {
                item: item.id.clone(),
                spec: name.clone(),
                value: spec.value,
            });
        }
    }
    Ok(())
}

/// Equipment for a whole train plus the stages that could not be sized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainSizing {
    pub items: Vec<EquipmentItem>,
    /// Stage index and the reason it produced no equipment.
    pub failures: Vec<(usize, SizingError)>,
}

/// Size every stage of a train in order.
///
/// A stage that fails contributes no equipment and consumes no ids; the
/// remaining stages are still sized.
pub fn size_train(stages: &[Stage], ids: &mut IdAllocator) -> TrainSizing {
    let mut sizing = TrainSizing::default();
    for (index, stage) in stages.iter().enumerate() {
        let checkpoint = ids.clone();
        match size_stage(stage, ids) {
            Ok(items) => sizing.items.extend(items),
            Err(e) => {
                tracing::warn!(stage = %stage.name, error = %e, "stage not sized");
                *ids = checkpoint;
                sizing.failures.push((index, e));
            }
        }
    }
    sizing
}
