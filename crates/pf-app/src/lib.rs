//! Variant orchestration for plantflow.
//!
//! Each variant wires feed interpretation, topology selection, recycle
//! convergence and equipment sizing into one [`SimulationResult`]:
//!
//! - [`run_liquid`]: wastewater train with recycle convergence
//! - [`run_solids_to_gas`]: feedstock digestion and biogas upgrading
//! - [`run_gas_only`]: conditioning and upgrading of an existing gas stream
//! - [`run_hybrid`]: liquid train whose sludge co-digests with trucked feedstock
//!
//! Input problems never fail a run. They are reported as warnings and
//! assumptions on the result; `Err` means an internal invariant broke.

pub mod error;
pub mod feed;
pub mod gas;
pub mod hybrid;
pub mod liquid;
mod pipeline;
pub mod result;
pub mod solids;

pub use error::{AppError, AppResult};
pub use feed::{interpret_feed, interpret_feeds};
pub use gas::run_gas_only;
pub use hybrid::run_hybrid;
pub use liquid::run_liquid;
pub use result::{Assumption, Ledger, Metric, Severity, SimulationResult, Variant, Warning};
pub use solids::run_solids_to_gas;

use pf_project::{EngineConfig, Project};

/// Run one variant against a project.
pub fn simulate(variant: Variant, project: &Project, config: &EngineConfig) -> AppResult<SimulationResult> {
    tracing::debug!(%variant, project = %project.name, "simulate");
    match variant {
        Variant::Liquid => run_liquid(project, config),
        Variant::SolidsToGas => run_solids_to_gas(project, config),
        Variant::GasOnly => run_gas_only(project, config),
        Variant::Hybrid => run_hybrid(project, config),
    }
}
