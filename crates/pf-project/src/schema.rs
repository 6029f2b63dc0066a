//! Project schema definitions.

use pf_streams::{StreamClass, parse_numeric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const LATEST_VERSION: u32 = 1;

fn latest_version() -> u32 {
    LATEST_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default = "latest_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub feed_streams: Vec<FeedStreamDef>,
    #[serde(default)]
    pub outputs: Vec<OutputTargetDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-text constraints and design intent ("MBR preferred", "Class A reuse").
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Field path to value, e.g. `activated_sludge.solids_retention_time: 12`.
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            feed_streams: Vec::new(),
            outputs: Vec::new(),
            location: None,
            constraints: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn feeds_of(&self, kind: FeedKind) -> impl Iterator<Item = (usize, &FeedStreamDef)> {
        self.feed_streams
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.kind == kind)
    }
}

/// Phase of a declared feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    #[serde(alias = "wastewater", alias = "influent")]
    Liquid,
    #[serde(alias = "sludge", alias = "feedstock", alias = "organics")]
    Solids,
    #[serde(alias = "biogas")]
    Gas,
}

impl FeedKind {
    pub fn class(self) -> StreamClass {
        match self {
            FeedKind::Liquid => StreamClass::Liquid,
            FeedKind::Solids => StreamClass::Solids,
            FeedKind::Gas => StreamClass::Gas,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedStreamDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: FeedKind,
    pub flow: RawValue,
    /// Empty when the unit is embedded in `flow` ("500 m3/d").
    #[serde(default)]
    pub flow_unit: String,
    #[serde(default)]
    pub specs: BTreeMap<String, SpecDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecDef {
    pub value: RawValue,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputTargetDef {
    pub name: String,
    pub value: RawValue,
    #[serde(default)]
    pub unit: String,
    /// e.g. "effluent", "rng", "digestate"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// A number, or free text that may contain one ("< 10", "approx. 1,200", "TBD").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Numeric reading; `None` when nothing usable is present.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) if v.is_finite() => Some(*v),
            RawValue::Number(_) => None,
            RawValue::Text(text) => parse_numeric(text),
        }
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_read_numbers_and_text() {
        assert_eq!(RawValue::Number(4.0).as_f64(), Some(4.0));
        assert_eq!(RawValue::from("< 10 mg/L").as_f64(), Some(10.0));
        assert_eq!(RawValue::from("TBD").as_f64(), None);
        assert_eq!(RawValue::Number(f64::NAN).as_f64(), None);
    }

    #[test]
    fn feed_kind_aliases() {
        let kind: FeedKind = serde_yaml::from_str("sludge").unwrap();
        assert_eq!(kind, FeedKind::Solids);
        let kind: FeedKind = serde_yaml::from_str("biogas").unwrap();
        assert_eq!(kind.class(), StreamClass::Gas);
    }

    #[test]
    fn untagged_value_accepts_both_forms() {
        let spec: SpecDef = serde_yaml::from_str("value: 250\nunit: mg/L").unwrap();
        assert_eq!(spec.value, RawValue::Number(250.0));
        let spec: SpecDef = serde_yaml::from_str("value: \"about 250\"").unwrap();
        assert_eq!(spec.value.as_f64(), Some(250.0));
        assert!(spec.unit.is_empty());
    }
}
