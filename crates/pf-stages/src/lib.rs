//! pf-stages: unit-operation library for treatment and conversion trains.
//!
//! Provides:
//! - the closed set of stage kinds ([`StageKind`])
//! - default removal-efficiency and design-criteria tables with citations
//! - named topology thresholds
//! - field-path overrides for per-run calibration
//! - stage transforms mapping an influent stream to an effluent stream
//!
//! All transforms are pure functions of the influent and the stage design, so a
//! stage can be re-evaluated any number of times during recycle convergence.
//!
//! # Example
//!
//! ```
//! use pf_stages::{DefaultTables, Stage, StageKind};
//! use pf_streams::{Analyte, Stream};
//!
//! let tables = DefaultTables::standard();
//! let mut stage = Stage::new(StageKind::ActivatedSludge, tables.design_for(StageKind::ActivatedSludge));
//!
//! let influent = Stream::liquid(1_000.0).unwrap().with_value(Analyte::Bod, 200.0).unwrap();
//! stage.evaluate(influent).unwrap();
//!
//! assert!(stage.effluent.value_or_zero(Analyte::Bod) < 200.0);
//! ```

pub mod criteria;
pub mod defaults;
pub mod error;
pub mod kind;
pub mod overrides;
pub mod stage;
pub mod thresholds;
pub mod transform;

// Re-exports
pub use criteria::{Bounds, CriteriaSet, Criterion, DesignCriterion, USER_OVERRIDE};
pub use defaults::{DefaultTables, RemovalEfficiency, RemovalProfile, StageDesign};
pub use error::{StageError, StageResult};
pub use kind::StageKind;
pub use overrides::FieldPath;
pub use stage::{Stage, TransformProfile};
pub use thresholds::Thresholds;
pub use transform::{StageOutput, apply_removal, transform};
