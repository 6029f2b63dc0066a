//! pf-streams: stream values and the unit model.
//!
//! A [`Stream`] is an immutable flow of liquid, gas or solids with a canonical
//! flow rate and a closed set of [`Analyte`] values. Anything that does not map
//! onto a known analyte is kept in the stream's `additional` bucket.
//!
//! Canonical flow units per class:
//! - liquid: m³/d
//! - gas: standard m³/d
//! - solids: wet kg/d
//!
//! # Example
//!
//! ```
//! use pf_streams::{Analyte, Stream};
//!
//! let influent = Stream::liquid(1_000.0)
//!     .unwrap()
//!     .with_value(Analyte::Bod, 250.0)
//!     .unwrap();
//!
//! assert_eq!(influent.load_kg_per_day(Analyte::Bod), Some(250.0));
//! ```

pub mod analyte;
pub mod error;
pub mod stream;
pub mod units;

// Re-exports
pub use analyte::{Analyte, StreamClass};
pub use error::{StreamError, StreamResult};
pub use stream::{Measured, Stream, blend};
pub use units::{Flow, FlowUnit, UnitError, convert, parse_flow, parse_numeric, split_value_and_unit};
