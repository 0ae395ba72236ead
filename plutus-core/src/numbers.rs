//! Numeric helpers shared by the interpreters, the position ledger and the
//! selection layer.
//!
//! Every helper that produces a persisted value rounds to 2 decimals at the
//! point of computation. Backtest numbers are reproduced exactly only when the
//! rounding happens incrementally, never once at the end.

/// Round to 2 decimal places.
///
/// Ties on the exact binary value go to the even digit, so `0.125` becomes
/// `0.12`. Scaling by 100 first would drift on values such as `2.675`.
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Alter `value` by `percent`: 100 altered by 50 is 150, altered by -50 is 50.
pub fn alter_by_percentage(value: f64, percent: f64) -> f64 {
    let altered = if percent > 0.0 {
        (percent / 100.0 + 1.0) * value
    } else if percent < 0.0 {
        (1.0 - (-percent) / 100.0) * value
    } else {
        value
    };
    round2(altered)
}

/// Percentage change from `old` to `new`, floored at -100%.
///
/// A zero reference value yields 0 rather than an infinite change.
pub fn percentage_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    let change = (new - old) / old * 100.0;
    round2(change.max(-100.0))
}

/// Share of `value` in `total`, as a percentage.
pub fn percentage_out_of_total(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    round2(value * 100.0 / total)
}

/// Median of a slice. Empty input yields 0.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Arithmetic mean of a slice. Empty input yields 0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alter_increases_and_decreases() {
        assert_eq!(alter_by_percentage(100.0, 50.0), 150.0);
        assert_eq!(alter_by_percentage(100.0, -50.0), 50.0);
        assert_eq!(alter_by_percentage(100.0, 0.0), 100.0);
    }

    #[test]
    fn alter_rounds_to_two_decimals() {
        assert_eq!(alter_by_percentage(40050.85, 1.0), 40451.36);
        assert_eq!(alter_by_percentage(40050.85, -1.0), 39650.34);
    }

    #[test]
    fn fee_adjusted_points() {
        assert_eq!(alter_by_percentage(1.0, -10.0), 0.9);
        assert_eq!(alter_by_percentage(1.0, 10.0), 1.1);
        assert_eq!(alter_by_percentage(1.5, 10.0), 1.65);
    }

    #[test]
    fn percentage_change_basic() {
        assert_eq!(percentage_change(100.0, 105.0), 5.0);
        assert_eq!(percentage_change(100.0, 95.0), -5.0);
        assert_eq!(percentage_change(100.0, 100.0), 0.0);
    }

    #[test]
    fn percentage_change_zero_reference() {
        assert_eq!(percentage_change(0.0, 50.0), 0.0);
    }

    #[test]
    fn percentage_change_floored_at_minus_100() {
        assert_eq!(percentage_change(1.0, -5.0), -100.0);
    }

    #[test]
    fn percentage_change_rounds() {
        // (100 - 100.5) / 100.5 * 100 = -0.4975...
        assert_eq!(percentage_change(100.5, 100.0), -0.5);
    }

    #[test]
    fn round2_ties_go_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        // 2.675 is stored just below the tie
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(33.333), 33.33);
    }

    #[test]
    fn percentage_change_exact_tie() {
        // 1 / 800 * 100 lands on 0.125
        assert_eq!(percentage_change(800.0, 801.0), 0.12);
    }

    #[test]
    fn out_of_total() {
        assert_eq!(percentage_out_of_total(1.0, 3.0), 33.33);
        assert_eq!(percentage_out_of_total(3.0, 5.0), 60.0);
        assert_eq!(percentage_out_of_total(3.0, 0.0), 0.0);
    }

    #[test]
    fn median_odd_even_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }
}
