//! Named thresholds gating optional stages.

use serde::{Deserialize, Serialize};

/// Engineering heuristics used by topology selection.
///
/// Values are uncited rules of thumb; each can be overridden per run with a
/// `thresholds.<name>` field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// BOD or TSS target at or below which tertiary filtration is added (mg/L).
    pub tertiary_bod_tss_mg_l: f64,
    /// Ammonia or TKN target at or below which nitrification is added (mg/L).
    pub nitrification_mg_l: f64,
    /// Nitrogen target at or below which denitrification is added (mg/L).
    pub strict_nitrogen_mg_l: f64,
    /// Phosphorus target at or below which chemical removal is added (mg/L).
    pub phosphorus_mg_l: f64,
    /// Feed FOG above which flotation is added (mg/L).
    pub daf_fog_mg_l: f64,
    /// Solids content above which dilution water is added (%).
    pub pumpable_solids_pct: f64,
    pub cn_ratio_min: f64,
    pub cn_ratio_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            tertiary_bod_tss_mg_l: 10.0,
            nitrification_mg_l: 10.0,
            strict_nitrogen_mg_l: 5.0,
            phosphorus_mg_l: 1.0,
            daf_fog_mg_l: 150.0,
            pumpable_solids_pct: 15.0,
            cn_ratio_min: 15.0,
            cn_ratio_max: 35.0,
        }
    }
}

impl Thresholds {
    /// Set a threshold by name. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "tertiary_bod_tss_mg_l" => &mut self.tertiary_bod_tss_mg_l,
            "nitrification_mg_l" => &mut self.nitrification_mg_l,
            "strict_nitrogen_mg_l" => &mut self.strict_nitrogen_mg_l,
            "phosphorus_mg_l" => &mut self.phosphorus_mg_l,
            "daf_fog_mg_l" => &mut self.daf_fog_mg_l,
            "pumpable_solids_pct" => &mut self.pumpable_solids_pct,
            "cn_ratio_min" => &mut self.cn_ratio_min,
            "cn_ratio_max" => &mut self.cn_ratio_max,
            _ => return false,
        };
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_by_name() {
        let mut t = Thresholds::default();
        assert!(t.set("phosphorus_mg_l", 0.5));
        assert_eq!(t.phosphorus_mg_l, 0.5);
        assert!(!t.set("nonsense", 1.0));
        assert_eq!(t.tertiary_bod_tss_mg_l, 10.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let t: Thresholds = serde_yaml::from_str("daf_fog_mg_l: 100.0\n").unwrap();
        assert_eq!(t.daf_fog_mg_l, 100.0);
        assert_eq!(t.cn_ratio_max, 35.0);
    }
}
