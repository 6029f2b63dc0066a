//! Recycle convergence for treatment trains.
//!
//! Internal recycles (return sludge, backwash, float subnatant, thickening
//! filtrate) feed back upstream. The solver re-runs the train as a fixed-point
//! iteration until every recycle flow changes by less than the tolerance, or
//! the iteration cap is reached. Hitting the cap is reported, not raised.

pub mod error;
pub mod recycle;
pub mod solve;

pub use error::{SolverError, SolverResult};
pub use recycle::{RecycleStream, recycles_for};
pub use solve::{ConvergenceReport, SolverConfig, SolverOutcome, chain, solve};
