//! pf-core: stable foundation for plantflow.
//!
//! Contains:
//! - units (uom SI types + constructors used by sizing formulas)
//! - numeric (Real, rounding, unit counts, relative change)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PfError, PfResult};
pub use numeric::*;
pub use units::*;
