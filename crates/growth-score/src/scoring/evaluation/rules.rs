use super::super::domain::CategoryScore;

/// Weighted mean over categories that are both scored and weighted.
///
/// Unscored or zero-weight categories drop out of numerator and denominator alike, so a
/// partially scored applicant is averaged over what has been submitted. Halves round up.
pub(crate) fn weighted_aggregate(scores: &[CategoryScore], weights: &[u32]) -> i64 {
    let (numerator, denominator) = scores.iter().zip(weights).fold(
        (0_i128, 0_i128),
        |(numerator, denominator), (score, weight)| match score.value() {
            Some(value) if *weight > 0 => (
                numerator + i128::from(value) * i128::from(*weight),
                denominator + i128::from(*weight),
            ),
            _ => (numerator, denominator),
        },
    );

    if denominator == 0 {
        return 0;
    }

    let rounded = (2 * numerator + denominator).div_euclid(2 * denominator);
    // a weighted mean never leaves the range of its inputs
    rounded as i64
}

/// Seconds left before a non-forced update is allowed, or `None` when it may proceed.
pub(crate) fn cooldown_remaining(last_update: i64, now: i64, cooldown_seconds: u64) -> Option<i64> {
    let elapsed = i128::from(now) - i128::from(last_update);
    let cooldown = i128::from(cooldown_seconds);
    if elapsed >= cooldown {
        None
    } else {
        Some(i64::try_from(cooldown - elapsed).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CategoryScore::{Set, Unset};

    const WEIGHTS: [u32; 10] = [4, 1, 1, 1, 1, 2, 1, 1, 1, 1];

    fn set_all(values: [i64; 10]) -> Vec<CategoryScore> {
        values.into_iter().map(Set).collect()
    }

    #[test]
    fn uniform_scores_average_to_themselves() {
        assert_eq!(weighted_aggregate(&set_all([10; 10]), &WEIGHTS), 10);
    }

    #[test]
    fn weights_scale_each_category() {
        let scores = set_all([40, 50, 50, 55, 55, 59, 50, 50, 55, 50]);
        // 693 / 14 = 49.5
        assert_eq!(weighted_aggregate(&scores, &WEIGHTS), 50);
    }

    #[test]
    fn weighted_half_rounds_onto_breakpoint() {
        let scores = set_all([40, 50, 50, 55, 55, 59, 50, 50, 55, 50]);
        let aggregate = weighted_aggregate(&scores, &WEIGHTS);
        let table = super::super::LevelTable::new(&[25, 50, 75], &[0, 1, 2, 3]).expect("table");
        assert_eq!(aggregate, 50);
        assert_eq!(table.resolve(aggregate), 2);

        let mut below = scores;
        below[9] = Unset;
        // 643 / 13 = 49.46
        assert_eq!(weighted_aggregate(&below, &WEIGHTS), 49);
    }

    #[test]
    fn unset_categories_are_excluded() {
        let mut scores = vec![Unset; 10];
        scores[0] = Set(100);
        scores[1] = Set(100);
        assert_eq!(weighted_aggregate(&scores, &WEIGHTS), 100);
    }

    #[test]
    fn zero_weight_categories_are_excluded() {
        let scores = vec![Set(90), Set(0)];
        assert_eq!(weighted_aggregate(&scores, &[3, 0]), 90);
    }

    #[test]
    fn empty_inclusion_yields_zero() {
        assert_eq!(weighted_aggregate(&vec![Unset; 10], &WEIGHTS), 0);
        assert_eq!(weighted_aggregate(&[Set(40)], &[0]), 0);
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(weighted_aggregate(&[Set(1), Set(2)], &[1, 1]), 2);
        assert_eq!(weighted_aggregate(&[Set(-1), Set(-2)], &[1, 1]), -1);
        assert_eq!(weighted_aggregate(&[Set(1), Set(1), Set(2)], &[1, 1, 1]), 1);
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        assert_eq!(cooldown_remaining(100, 103, 5), Some(2));
        assert_eq!(cooldown_remaining(100, 105, 5), None);
        assert_eq!(cooldown_remaining(100, 90, 0), Some(10));
        assert_eq!(cooldown_remaining(100, 100, 0), None);
    }
}
