//! Stage-list selection rules.

use crate::signals::Signals;
use pf_stages::{StageKind, Thresholds};
use pf_streams::Analyte;

const FIXED_FILM: &[&str] = &["trickling", "fixed film", "fixed-film", "biofilm"];
const TERTIARY: &[&str] = &["filtration", "tertiary", "reuse", "reclaimed"];
const NITROGEN: &[&str] = &["nitrogen removal", "nitrification", "bnr", "ammonia", "nutrient removal"];
const PHOSPHORUS: &[&str] = &["phosphorus removal", "chemical p", "phosphate removal"];
const FLOTATION: &[&str] = &["dissolved air flotation", "daf", "grease", "flotation"];
const PACKAGED: &[&str] = &["packaged", "depackag", "expired", "grocery", "supermarket"];

const NITROGEN_ANALYTES: &[Analyte] = &[Analyte::Ammonia, Analyte::Tkn, Analyte::Nitrate];

/// Which pipeline to select for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainKind {
    Liquid,
    Solids,
    GasOnly,
}

pub fn select(kind: TrainKind, signals: &Signals, thresholds: &Thresholds) -> Vec<StageKind> {
    match kind {
        TrainKind::Liquid => select_liquid_train(signals, thresholds),
        TrainKind::Solids => select_solids_train(signals, thresholds),
        TrainKind::GasOnly => select_gas_train(),
    }
}

fn secondary(signals: &Signals) -> StageKind {
    let hints = &signals.hints;
    if hints.mentions(&["membrane"]) || hints.mentions_word("mbr") {
        StageKind::MembraneBioreactor
    } else if hints.mentions(FIXED_FILM) {
        StageKind::TricklingFilter
    } else {
        StageKind::ActivatedSludge
    }
}

fn at_or_below(limit: Option<f64>, threshold: f64) -> bool {
    limit.is_some_and(|l| l <= threshold)
}

/// Liquid train: headworks, one secondary, optional nutrient and tertiary
/// steps, then disinfection.
pub fn select_liquid_train(signals: &Signals, thresholds: &Thresholds) -> Vec<StageKind> {
    let hints = &signals.hints;
    let mut train = vec![
        StageKind::Preliminary,
        StageKind::Equalization,
        StageKind::PrimaryClarifier,
    ];

    let fog_high = signals
        .feed_fog_mg_l
        .is_some_and(|fog| fog > thresholds.daf_fog_mg_l);
    if fog_high || hints.mentions(FLOTATION) {
        train.push(StageKind::DissolvedAirFlotation);
    }

    let secondary = secondary(signals);
    train.push(secondary);

    let tn_target = signals.has_target(Analyte::TotalNitrogen);
    let nitrogen_limit = signals.tightest_limit(NITROGEN_ANALYTES);
    let total_limit = signals.tightest_limit(&[Analyte::TotalNitrogen]);
    let strict = at_or_below(nitrogen_limit, thresholds.strict_nitrogen_mg_l)
        || at_or_below(total_limit, thresholds.strict_nitrogen_mg_l);

    let nitrify = at_or_below(nitrogen_limit, thresholds.nitrification_mg_l)
        || tn_target
        || hints.mentions(NITROGEN);
    if nitrify {
        train.push(StageKind::Nitrification);
        if tn_target || strict || secondary != StageKind::MembraneBioreactor {
            train.push(StageKind::Denitrification);
        }
    }

    let phosphorus_limit = signals.tightest_limit(&[Analyte::TotalPhosphorus]);
    if at_or_below(phosphorus_limit, thresholds.phosphorus_mg_l) || hints.mentions(PHOSPHORUS) {
        train.push(StageKind::ChemicalPhosphorus);
    }

    let solids_limit = signals.tightest_limit(&[Analyte::Bod, Analyte::Tss]);
    if at_or_below(solids_limit, thresholds.tertiary_bod_tss_mg_l) || hints.mentions(TERTIARY) {
        train.push(StageKind::TertiaryFiltration);
    }

    train.push(StageKind::Disinfection);
    tracing::debug!(stages = train.len(), ?secondary, "liquid train selected");
    train
}

/// Solids-to-gas pipeline with depackaging and dilution gated on feed signals.
pub fn select_solids_train(signals: &Signals, thresholds: &Thresholds) -> Vec<StageKind> {
    let mut train = vec![StageKind::Receiving];
    if signals.hints.mentions(PACKAGED) {
        train.push(StageKind::Depackaging);
    }
    train.push(StageKind::Preparation);
    if signals
        .feed_solids_pct
        .is_some_and(|pct| pct > thresholds.pumpable_solids_pct)
    {
        train.push(StageKind::Dilution);
    }
    train.extend([
        StageKind::FeedEqualization,
        StageKind::Digestion,
        StageKind::Dewatering,
        StageKind::LiquidPolishing,
    ]);
    train.extend(select_gas_train());
    train
}

pub fn select_gas_train() -> Vec<StageKind> {
    vec![
        StageKind::GasConditioning,
        StageKind::GasUpgrading,
        StageKind::GasManagement,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Hints, Target};

    fn with_targets(targets: &[(&str, f64)]) -> Signals {
        Signals {
            targets: targets
                .iter()
                .map(|(n, v)| Target::classify(n, *v, "mg/L"))
                .collect(),
            ..Signals::default()
        }
    }

    fn with_hints(text: &str) -> Signals {
        Signals {
            hints: Hints::new([text]),
            ..Signals::default()
        }
    }

    #[test]
    fn default_liquid_train() {
        let train = select_liquid_train(&Signals::default(), &Thresholds::default());
        assert_eq!(
            train,
            vec![
                StageKind::Preliminary,
                StageKind::Equalization,
                StageKind::PrimaryClarifier,
                StageKind::ActivatedSludge,
                StageKind::Disinfection,
            ]
        );
    }

    #[test]
    fn secondary_from_keywords() {
        let t = Thresholds::default();
        assert!(select_liquid_train(&with_hints("MBR preferred"), &t).contains(&StageKind::MembraneBioreactor));
        assert!(select_liquid_train(&with_hints("existing trickling filters"), &t).contains(&StageKind::TricklingFilter));
        let mbr = select_liquid_train(&with_hints("membrane"), &t);
        assert_eq!(mbr.iter().filter(|k| k.is_secondary()).count(), 1);
    }

    #[test]
    fn strict_tkn_adds_nitrogen_stages_in_order() {
        let train = select_liquid_train(&with_targets(&[("TKN", 5.0)]), &Thresholds::default());
        let pos = |k| train.iter().position(|s| *s == k).unwrap();
        assert!(pos(StageKind::ActivatedSludge) < pos(StageKind::Nitrification));
        assert!(pos(StageKind::Nitrification) < pos(StageKind::Denitrification));
        assert!(pos(StageKind::Denitrification) < pos(StageKind::Disinfection));
    }

    #[test]
    fn mbr_with_loose_ammonia_target_skips_denitrification() {
        let mut signals = with_targets(&[("NH3-N", 8.0)]);
        signals.hints = Hints::new(["MBR"]);
        let train = select_liquid_train(&signals, &Thresholds::default());
        assert!(train.contains(&StageKind::Nitrification));
        assert!(!train.contains(&StageKind::Denitrification));
    }

    #[test]
    fn tertiary_and_phosphorus_thresholds() {
        let t = Thresholds::default();
        let train = select_liquid_train(&with_targets(&[("BOD", 10.0), ("TP", 0.5)]), &t);
        assert!(train.contains(&StageKind::TertiaryFiltration));
        assert!(train.contains(&StageKind::ChemicalPhosphorus));

        let loose = select_liquid_train(&with_targets(&[("BOD", 30.0), ("TP", 2.0)]), &t);
        assert!(!loose.contains(&StageKind::TertiaryFiltration));
        assert!(!loose.contains(&StageKind::ChemicalPhosphorus));
    }

    #[test]
    fn thresholds_are_honoured() {
        let mut t = Thresholds::default();
        t.tertiary_bod_tss_mg_l = 30.0;
        let train = select_liquid_train(&with_targets(&[("BOD", 30.0)]), &t);
        assert!(train.contains(&StageKind::TertiaryFiltration));
    }

    #[test]
    fn high_fog_adds_flotation_after_primary() {
        let signals = Signals {
            feed_fog_mg_l: Some(400.0),
            ..Signals::default()
        };
        let train = select_liquid_train(&signals, &Thresholds::default());
        assert_eq!(train[3], StageKind::DissolvedAirFlotation);
    }

    #[test]
    fn solids_optional_steps() {
        let t = Thresholds::default();
        let plain = select_solids_train(&Signals::default(), &t);
        assert!(!plain.contains(&StageKind::Depackaging));
        assert!(!plain.contains(&StageKind::Dilution));
        assert_eq!(plain.first(), Some(&StageKind::Receiving));
        assert_eq!(plain.last(), Some(&StageKind::GasManagement));

        let signals = Signals {
            hints: Hints::new(["expired packaged food"]),
            feed_solids_pct: Some(25.0),
            ..Signals::default()
        };
        let full = select_solids_train(&signals, &t);
        assert_eq!(full[1], StageKind::Depackaging);
        assert!(full.contains(&StageKind::Dilution));
    }
}
