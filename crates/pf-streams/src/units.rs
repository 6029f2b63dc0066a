//! Flow units, conversions and tolerant numeric parsing.
//!
//! # Key Design
//!
//! - **Raw text**: feed values arrive as whatever the upstream extractor produced
//!   ("1,200 gpm", "< 30 mg/L", "200-300", "25%")
//! - **Canonical value**: one unit per stream class (m³/d, Nm³/d, kg/d)
//! - **Unknown sentinel**: an unparsable number is `None`; the caller decides
//!   whether that is fatal or assumption-worthy
//!
//! Gas volumes are carried as standard cubic meters; standard cubic feet are
//! converted geometrically (1 ft³ = 0.028 316 8 m³) without a reference-state
//! correction.

use crate::analyte::StreamClass;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error in unit parsing or conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Input text did not parse to a number
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unit not recognized
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    /// Conversion requested across stream classes (e.g. gpm to kg/d)
    #[error("Cannot convert {from:?} to {to:?}")]
    ClassMismatch { from: FlowUnit, to: FlowUnit },
}

const GALLON_M3: f64 = 3.785_411_784e-3;
const CUBIC_FOOT_M3: f64 = 2.831_684_659e-2;
const SHORT_TON_KG: f64 = 907.184_74;
const POUND_KG: f64 = 0.453_592_37;
const DAYS_PER_YEAR: f64 = 365.0;

/// Supported flow units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowUnit {
    // liquid
    M3PerDay,
    M3PerHour,
    M3PerMinute,
    LitersPerSecond,
    LitersPerDay,
    Mgd,
    Gpm,
    Gpd,
    // gas
    Nm3PerDay,
    Nm3PerHour,
    Scfm,
    Scfh,
    Scfd,
    // solids
    KgPerDay,
    KgPerHour,
    KgPerYear,
    TonnesPerDay,
    TonnesPerYear,
    ShortTonsPerDay,
    ShortTonsPerYear,
    LbPerDay,
}

impl FlowUnit {
    pub const ALL: [FlowUnit; 21] = [
        FlowUnit::M3PerDay,
        FlowUnit::M3PerHour,
        FlowUnit::M3PerMinute,
        FlowUnit::LitersPerSecond,
        FlowUnit::LitersPerDay,
        FlowUnit::Mgd,
        FlowUnit::Gpm,
        FlowUnit::Gpd,
        FlowUnit::Nm3PerDay,
        FlowUnit::Nm3PerHour,
        FlowUnit::Scfm,
        FlowUnit::Scfh,
        FlowUnit::Scfd,
        FlowUnit::KgPerDay,
        FlowUnit::KgPerHour,
        FlowUnit::KgPerYear,
        FlowUnit::TonnesPerDay,
        FlowUnit::TonnesPerYear,
        FlowUnit::ShortTonsPerDay,
        FlowUnit::ShortTonsPerYear,
        FlowUnit::LbPerDay,
    ];

    pub fn class(self) -> StreamClass {
        use FlowUnit::*;
        match self {
            M3PerDay | M3PerHour | M3PerMinute | LitersPerSecond | LitersPerDay | Mgd | Gpm
            | Gpd => StreamClass::Liquid,
            Nm3PerDay | Nm3PerHour | Scfm | Scfh | Scfd => StreamClass::Gas,
            KgPerDay | KgPerHour | KgPerYear | TonnesPerDay | TonnesPerYear | ShortTonsPerDay
            | ShortTonsPerYear | LbPerDay => StreamClass::Solids,
        }
    }

    /// Multiplier taking a value in this unit to the class's canonical unit.
    pub fn factor(self) -> f64 {
        use FlowUnit::*;
        match self {
            M3PerDay => 1.0,
            M3PerHour => 24.0,
            M3PerMinute => 1_440.0,
            LitersPerSecond => 86.4,
            LitersPerDay => 1e-3,
            Mgd => 1e6 * GALLON_M3,
            Gpm => 1_440.0 * GALLON_M3,
            Gpd => GALLON_M3,
            Nm3PerDay => 1.0,
            Nm3PerHour => 24.0,
            Scfm => 1_440.0 * CUBIC_FOOT_M3,
            Scfh => 24.0 * CUBIC_FOOT_M3,
            Scfd => CUBIC_FOOT_M3,
            KgPerDay => 1.0,
            KgPerHour => 24.0,
            KgPerYear => 1.0 / DAYS_PER_YEAR,
            TonnesPerDay => 1_000.0,
            TonnesPerYear => 1_000.0 / DAYS_PER_YEAR,
            ShortTonsPerDay => SHORT_TON_KG,
            ShortTonsPerYear => SHORT_TON_KG / DAYS_PER_YEAR,
            LbPerDay => POUND_KG,
        }
    }

    pub fn symbol(self) -> &'static str {
        use FlowUnit::*;
        match self {
            M3PerDay => "m3/d",
            M3PerHour => "m3/h",
            M3PerMinute => "m3/min",
            LitersPerSecond => "L/s",
            LitersPerDay => "L/d",
            Mgd => "MGD",
            Gpm => "gpm",
            Gpd => "gpd",
            Nm3PerDay => "Nm3/d",
            Nm3PerHour => "Nm3/h",
            Scfm => "scfm",
            Scfh => "scfh",
            Scfd => "scfd",
            KgPerDay => "kg/d",
            KgPerHour => "kg/h",
            KgPerYear => "kg/yr",
            TonnesPerDay => "t/d",
            TonnesPerYear => "t/yr",
            ShortTonsPerDay => "tons/d",
            ShortTonsPerYear => "tons/yr",
            LbPerDay => "lb/d",
        }
    }

    /// Parse a unit tag. Case, whitespace, superscripts and "per" spellings are tolerated.
    pub fn parse(text: &str) -> Option<Self> {
        let norm = normalize_unit(text);
        use FlowUnit::*;
        let unit = match norm.as_str() {
            "m3/d" | "cmd" | "m3pd" => M3PerDay,
            "m3/h" | "cmh" => M3PerHour,
            "m3/min" => M3PerMinute,
            "l/s" | "lps" => LitersPerSecond,
            "l/d" | "lpd" => LitersPerDay,
            "mgd" | "milliongallons/d" => Mgd,
            "gpm" | "gal/min" | "gallons/min" => Gpm,
            "gpd" | "gal/d" | "gallons/d" => Gpd,
            "nm3/d" | "scmd" | "sm3/d" => Nm3PerDay,
            "nm3/h" | "scmh" | "sm3/h" => Nm3PerHour,
            "scfm" | "cfm" | "ft3/min" => Scfm,
            "scfh" | "cfh" | "ft3/h" => Scfh,
            "scfd" | "cfd" | "ft3/d" => Scfd,
            "kg/d" | "kgpd" => KgPerDay,
            "kg/h" => KgPerHour,
            "kg/y" => KgPerYear,
            "t/d" | "tpd" | "tonnes/d" | "tonne/d" | "mt/d" | "metrictons/d" => TonnesPerDay,
            "t/y" | "tpy" | "tonnes/y" | "tonne/y" | "mt/y" | "metrictons/y" => TonnesPerYear,
            "tons/d" | "ton/d" | "shorttons/d" | "uston/d" | "ustons/d" => ShortTonsPerDay,
            "tons/y" | "ton/y" | "shorttons/y" | "ustons/y" => ShortTonsPerYear,
            "lb/d" | "lbs/d" | "ppd" => LbPerDay,
            _ => return None,
        };
        Some(unit)
    }
}

impl std::fmt::Display for FlowUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

fn normalize_unit(text: &str) -> String {
    let mut s: String = text
        .to_lowercase()
        .replace('³', "3")
        .replace("^3", "3")
        .replace(" per ", "/")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    for word in ["wet", "dry"] {
        s = s.replace(word, "");
    }
    // longest spellings first so "/days" is not left as "/ds"
    for (long, short) in [
        ("/days", "/d"),
        ("/day", "/d"),
        ("/hours", "/h"),
        ("/hour", "/h"),
        ("/hr", "/h"),
        ("/minutes", "/min"),
        ("/minute", "/min"),
        ("/years", "/y"),
        ("/year", "/y"),
        ("/yr", "/y"),
        ("/sec", "/s"),
        ("liters", "l"),
        ("litres", "l"),
        ("gallon/", "gallons/"),
    ] {
        s = s.replace(long, short);
    }
    s
}

/// Convert a value between two units of the same stream class.
pub fn convert(value: f64, from: FlowUnit, to: FlowUnit) -> Result<f64, UnitError> {
    if from.class() != to.class() {
        return Err(UnitError::ClassMismatch { from, to });
    }
    Ok(value * from.factor() / to.factor())
}

/// A flow rate with its unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub value: f64,
    pub unit: FlowUnit,
}

impl Flow {
    pub fn new(value: f64, unit: FlowUnit) -> Self {
        Self { value, unit }
    }

    pub fn class(&self) -> StreamClass {
        self.unit.class()
    }

    /// Value in the canonical unit of the flow's class.
    pub fn canonical(&self) -> f64 {
        self.value * self.unit.factor()
    }
}

/// Parse a numeric value out of decorated text.
///
/// Strips thousands separators, percent signs, comparison operators and
/// hedging words, then takes the first number. A range ("200-300",
/// "200 to 300") yields its midpoint. Returns `None` when no number is found.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned = clean_numeric_text(text);
    let numbers = scan_numbers(&cleaned);
    let (first, _, first_end) = *numbers.first()?;

    if let Some(&(second, second_start, _)) = numbers.get(1) {
        let between = cleaned[first_end..second_start].trim();
        if matches!(between, "-" | "–" | "to") && second >= first {
            return Some(0.5 * (first + second));
        }
    }
    Some(first)
}

/// Split a value+unit string into (numeric_value, unit_string).
///
/// Examples:
/// - "500 m3/d" -> (500.0, "m3/d")
/// - "1,200gpm" -> (1200.0, "gpm")
/// - "300" -> (300.0, "")
pub fn split_value_and_unit(input: &str) -> Result<(f64, String), UnitError> {
    let cleaned = clean_numeric_text(input);
    let numbers = scan_numbers(&cleaned);
    let (value, _, end) = *numbers.first().ok_or_else(|| {
        UnitError::ParseError(format!("Could not parse numeric value from '{}'", input))
    })?;
    Ok((value, cleaned[end..].trim().to_string()))
}

/// Parse a flow from a value text and a (possibly empty) unit text.
///
/// When `unit_text` is empty the unit embedded in `value_text` is used.
pub fn parse_flow(value_text: &str, unit_text: &str) -> Result<Flow, UnitError> {
    let (value, embedded_unit) = split_value_and_unit(value_text)?;
    let unit_src = if unit_text.trim().is_empty() {
        embedded_unit.as_str()
    } else {
        unit_text
    };
    let unit =
        FlowUnit::parse(unit_src).ok_or_else(|| UnitError::UnknownUnit(unit_src.to_string()))?;
    // ranges use the midpoint
    let value = parse_numeric(value_text).unwrap_or(value);
    Ok(Flow::new(value, unit))
}

fn clean_numeric_text(text: &str) -> String {
    let mut s = text.trim().to_lowercase();
    for word in ["approximately", "approx.", "approx", "about", "around", "up to", "+/-"] {
        s = s.replace(word, " ");
    }
    s.chars()
        .filter(|c| !matches!(c, ',' | '%' | '<' | '>' | '≤' | '≥' | '~' | '=' | '≈'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Find decimal numbers in `s` as (value, start, end) byte positions.
fn scan_numbers(s: &str) -> Vec<(f64, usize, usize)> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let prev_is_digit = i > 0 && bytes[i - 1].is_ascii_digit();
        let starts_negative = c == b'-'
            && !prev_is_digit
            && out.is_empty()
            && i + 1 < bytes.len()
            && (bytes[i + 1].is_ascii_digit() || bytes[i + 1] == b'.');
        let starts_number = c.is_ascii_digit()
            || (c == b'.' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit());
        // digits glued to letters (m3, co2) are part of a word
        let in_word = i > 0 && bytes[i - 1].is_ascii_alphabetic();

        if (starts_number || starts_negative) && !in_word {
            let start = i;
            let mut j = if starts_negative { i + 1 } else { i };
            let mut seen_dot = false;
            while j < bytes.len() && (bytes[j].is_ascii_digit() || (bytes[j] == b'.' && !seen_dot)) {
                if bytes[j] == b'.' {
                    seen_dot = true;
                }
                j += 1;
            }
            if let Ok(v) = s[start..j].parse::<f64>() {
                out.push((v, start, j));
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn same_class_round_trip(
            v in 0.0_f64..1.0e9,
            a in 0_usize..FlowUnit::ALL.len(),
            b in 0_usize..FlowUnit::ALL.len(),
        ) {
            let (from, to) = (FlowUnit::ALL[a], FlowUnit::ALL[b]);
            prop_assume!(from.class() == to.class());
            let there = convert(v, from, to).unwrap();
            let back = convert(there, to, from).unwrap();
            prop_assert!((back - v).abs() <= 1e-9 * v.max(1.0));
        }
    }
}
