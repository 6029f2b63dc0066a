/// Floating point type used throughout system
pub type Real = f64;

/// Magnitude below which a flow or load is treated as zero.
pub const EPSILON_FLOW: Real = 1e-12;

/// Round to a fixed number of decimal places.
///
/// Negative `decimals` round to tens, hundreds, ...
pub fn round_to(value: Real, decimals: i32) -> Real {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // avoid "-0" in reports
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Number of identical units needed to cover `required` when each provides `unit_capacity`.
///
/// Always at least one.
pub fn units_required(required: Real, unit_capacity: Real) -> u32 {
    if !required.is_finite() || !unit_capacity.is_finite() {
        return 1;
    }
    if required <= 0.0 || unit_capacity <= 0.0 {
        return 1;
    }
    // tolerate floating noise at exact multiples
    let n = (required / unit_capacity - 1e-9).ceil();
    n.max(1.0) as u32
}

/// Relative change of `new` against `old`.
///
/// A change away from zero counts as 100 %; zero to zero counts as no change.
pub fn relative_change(new: Real, old: Real) -> Real {
    if old.abs() <= EPSILON_FLOW {
        if new.abs() <= EPSILON_FLOW { 0.0 } else { 1.0 }
    } else {
        (new - old).abs() / old.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_decimals_and_tens() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(1234.0, -1), 1230.0);
        assert_eq!(round_to(-0.0001, 1), 0.0);
    }

    #[test]
    fn units_required_never_zero() {
        assert_eq!(units_required(0.0, 10.0), 1);
        assert_eq!(units_required(10.0, 10.0), 1);
        assert_eq!(units_required(10.5, 10.0), 2);
        assert_eq!(units_required(5.0, 0.0), 1);
    }

    #[test]
    fn relative_change_from_zero_is_full() {
        assert_eq!(relative_change(3.0, 0.0), 1.0);
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert!((relative_change(101.0, 100.0) - 0.01).abs() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rounding_stays_within_half_step(v in -1.0e6_f64..1.0e6, d in 0_i32..4) {
            let r = round_to(v, d);
            prop_assert!((r - v).abs() <= 0.5 * 10_f64.powi(-d) + 1e-9);
        }

        #[test]
        fn units_cover_requirement(req in 0.0_f64..1.0e5, cap in 0.1_f64..1.0e4) {
            let n = units_required(req, cap);
            prop_assert!(n >= 1);
            prop_assert!(f64::from(n) * cap >= req - 1e-6 * req.max(1.0));
        }
    }
}
