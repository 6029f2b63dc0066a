//! Topology selection: which stages a train contains, in what order.
//!
//! Selection is a priority-ordered set of pattern matches over declared
//! targets, free-text hints and feed composition. It is pure, total and
//! idempotent: the same [`Signals`] always give the same stage list.

pub mod select;
pub mod signals;

pub use select::{TrainKind, select, select_gas_train, select_liquid_train, select_solids_train};
pub use signals::{Hints, Signals, Target};
