//! Inputs inspected by topology selection.

use pf_streams::Analyte;
use serde::{Deserialize, Serialize};

/// A declared effluent/output limit mapped onto an analyte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    /// `None` when the name does not map onto a known analyte.
    pub analyte: Option<Analyte>,
    pub limit: f64,
    pub unit: String,
}

impl Target {
    /// Classify a declared output by its name.
    pub fn classify(name: &str, limit: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            analyte: Analyte::from_label(name),
            limit,
            unit: unit.to_string(),
        }
    }

    /// True when the limit is a concentration (mg/L or equivalent), not a
    /// percentage or a load.
    pub fn is_concentration(&self) -> bool {
        let unit = self.unit.trim().to_lowercase();
        unit.is_empty() || unit.contains("mg/l") || unit.contains("ppm") || unit.contains("g/m3")
    }

    fn concentration_limit(&self, analyte: Analyte) -> Option<f64> {
        (self.analyte == Some(analyte) && self.is_concentration() && self.limit.is_finite())
            .then_some(self.limit)
    }
}

/// Lower-cased free text (constraints, location, feed labels) for keyword matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hints {
    text: String,
}

impl Hints {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = parts
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join(" | ");
        Self { text }
    }

    /// Any of the needles appears in the text.
    pub fn mentions(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.text.contains(n))
    }

    /// True when the word appears as a whole token ("mbr" but not "umbrella").
    pub fn mentions_word(&self, word: &str) -> bool {
        self.text
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    }
}

/// Everything topology selection looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signals {
    pub targets: Vec<Target>,
    pub hints: Hints,
    /// Blended liquid feed FOG (mg/L), when known.
    pub feed_fog_mg_l: Option<f64>,
    /// Blended solids feed total-solids content (%), when known.
    pub feed_solids_pct: Option<f64>,
}

impl Signals {
    /// Tightest concentration limit declared for any of the analytes.
    pub fn tightest_limit(&self, analytes: &[Analyte]) -> Option<f64> {
        self.targets
            .iter()
            .flat_map(|t| analytes.iter().filter_map(move |a| t.concentration_limit(*a)))
            .reduce(f64::min)
    }

    pub fn has_target(&self, analyte: Analyte) -> bool {
        self.targets.iter().any(|t| t.analyte == Some(analyte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_classification() {
        let t = Target::classify("Effluent BOD5", 10.0, "mg/L");
        assert_eq!(t.analyte, Some(Analyte::Bod));
        assert!(t.is_concentration());

        let pct = Target::classify("TSS removal", 95.0, "%");
        assert!(!pct.is_concentration());
    }

    #[test]
    fn tightest_limit_ignores_percentages() {
        let signals = Signals {
            targets: vec![
                Target::classify("TSS", 30.0, "mg/L"),
                Target::classify("TSS", 8.0, "mg/l"),
                Target::classify("TSS removal", 1.0, "%"),
            ],
            ..Signals::default()
        };
        assert_eq!(signals.tightest_limit(&[Analyte::Tss]), Some(8.0));
        assert_eq!(signals.tightest_limit(&[Analyte::Bod]), None);
    }

    #[test]
    fn whole_word_matching() {
        let hints = Hints::new(["Site near umbrella factory"]);
        assert!(!hints.mentions_word("mbr"));
        let hints = Hints::new(["Prefer MBR for footprint"]);
        assert!(hints.mentions_word("mbr"));
    }
}
