//! Grouping and statistics primitives shared by the report definitions.
//!
//! Every function is total. Statistics that are undefined for the given
//! input return a sentinel instead of an error: `None` for the mean of an
//! empty series and `NaN` for standard deviation and correlation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Groups records by key. Keys come out sorted and each group keeps the
/// records in input order.
pub fn group_by<T, K, F>(
    records: impl IntoIterator<Item = T>,
    mut key_fn: F,
) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for record in records {
        groups.entry(key_fn(&record)).or_default().push(record);
    }
    groups
}

/// [`group_by`] for keys that may fail to compute; stops at the first error.
pub fn try_group_by<T, K, E, F>(
    records: impl IntoIterator<Item = T>,
    mut key_fn: F,
) -> Result<BTreeMap<K, Vec<T>>, E>
where
    K: Ord,
    F: FnMut(&T) -> Result<K, E>,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for record in records {
        let key = key_fn(&record)?;
        groups.entry(key).or_default().push(record);
    }
    Ok(groups)
}

/// Arithmetic mean, `None` for an empty series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (denominator `n - 1`). `NaN` when n < 2.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let sum_sq = values.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    (sum_sq / (values.len() as f64 - 1.0)).sqrt()
}

/// Pearson correlation coefficient of two paired series.
///
/// `NaN` when the series differ in length, have fewer than two points, or
/// either one has zero variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return f64::NAN;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0_f64;
    let mut var_x = 0.0_f64;
    let mut var_y = 0.0_f64;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// 1-based rank of every record inside its group, keyed by record id.
///
/// Ranks are sequential: records with equal sort keys keep their input
/// order, so the first one seen gets the lower rank. Incomparable keys
/// (NaN) are treated as equal.
pub fn rank_within_group<'a, T, I, G, S, IdF, GroupF, SortF>(
    records: &'a [T],
    id_fn: IdF,
    group_fn: GroupF,
    sort_fn: SortF,
    order: SortOrder,
) -> HashMap<I, usize>
where
    I: Eq + Hash,
    G: Ord,
    S: PartialOrd,
    IdF: Fn(&'a T) -> I,
    GroupF: Fn(&'a T) -> G,
    SortF: Fn(&'a T) -> S,
{
    let groups = group_by(records.iter(), |record| group_fn(*record));
    let mut ranks = HashMap::with_capacity(records.len());

    for (_, mut members) in groups {
        // sort_by is stable, which is what preserves first-seen order on ties.
        members.sort_by(|a, b| {
            let ordering = sort_fn(*a)
                .partial_cmp(&sort_fn(*b))
                .unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        for (index, record) in members.into_iter().enumerate() {
            ranks.insert(id_fn(record), index + 1);
        }
    }
    ranks
}

/// Label of the highest threshold whose lower bound `value` reaches.
///
/// `thresholds` are `(lower_bound, label)` pairs in any order. Returns
/// `None` when `value` is below every bound.
pub fn bucket<'t, T, L>(value: T, thresholds: &'t [(T, L)]) -> Option<&'t L>
where
    T: PartialOrd + Copy,
{
    let mut ordered: Vec<&(T, L)> = thresholds.iter().collect();
    ordered.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ordered
        .into_iter()
        .find(|(bound, _)| value >= *bound)
        .map(|(_, label)| label)
}

/// `matching / total`, `None` for an empty population.
pub fn fraction(matching: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| matching as f64 / total as f64)
}

/// Number of distinct values, ignoring missing ones.
pub fn distinct_count<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values.into_iter().flatten().collect::<HashSet<_>>().len()
}

/// Orders `rows` by a float key. NaN and missing keys sort last.
pub fn sort_by_float<T, F>(rows: &mut [T], key_fn: F, order: SortOrder)
where
    F: Fn(&T) -> Option<f64>,
{
    rows.sort_by(|a, b| match (key_fn(a), key_fn(b)) {
        (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => match order {
            SortOrder::Ascending => x.total_cmp(&y),
            SortOrder::Descending => y.total_cmp(&x),
        },
        (Some(x), _) if !x.is_nan() => Ordering::Less,
        (_, Some(y)) if !y.is_nan() => Ordering::Greater,
        _ => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: [(i64, &str); 4] = [
        (1000, "Viral"),
        (100, "Popular"),
        (10, "Good"),
        (i64::MIN, "Low"),
    ];

    #[test]
    fn test_group_by_keeps_input_order() {
        let groups = group_by(vec![("b", 1), ("a", 2), ("b", 3)], |(key, _)| *key);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(groups["b"], vec![("b", 1), ("b", 3)]);
    }

    #[test]
    fn test_group_by_empty() {
        let groups = group_by(Vec::<i32>::new(), |x| *x);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_try_group_by_propagates_error() {
        let result: Result<BTreeMap<i32, Vec<i32>>, String> = try_group_by(vec![1, 2, 3], |x| {
            if *x == 2 {
                Err("bad".to_string())
            } else {
                Ok(*x)
            }
        });
        assert_eq!(result.unwrap_err(), "bad");
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[5.0, 5.0]), Some(5.0));
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_sample_stddev_uses_n_minus_one() {
        assert!(sample_stddev(&[]).is_nan());
        assert!(sample_stddev(&[3.0]).is_nan());
        // deviations from 5: -3,-1,-1,-1,0,0,2,4 -> 32 / 7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((sample_stddev(&values) - expected).abs() < 1e-12);
        assert_eq!(sample_stddev(&[4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_pearson_identical_series() {
        let xs = [1.0, 2.0, 3.0, 10.0];
        assert!((pearson_correlation(&xs, &xs) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_inverse_series() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [6.0, 4.0, 2.0];
        assert!((pearson_correlation(&xs, &ys) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert!(pearson_correlation(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson_correlation(&[1.0], &[1.0]).is_nan());
        assert!(pearson_correlation(&[], &[]).is_nan());
        assert!(pearson_correlation(&[1.0, 2.0], &[1.0]).is_nan());
    }

    #[test]
    fn test_rank_ties_are_first_seen_wins() {
        let posts = vec![("P1", "a", 10), ("P2", "a", 10)];
        let ranks = rank_within_group(
            &posts,
            |p| p.0,
            |p| p.1,
            |p| p.2,
            SortOrder::Descending,
        );
        assert_eq!(ranks["P1"], 1);
        assert_eq!(ranks["P2"], 2);
    }

    #[test]
    fn test_rank_is_per_group_and_idempotent() {
        let posts = vec![
            ("x1", "a", 5),
            ("y1", "b", 1),
            ("x2", "a", 50),
            ("y2", "b", 9),
            ("x3", "a", 5),
        ];
        let rank = || {
            rank_within_group(&posts, |p| p.0, |p| p.1, |p| p.2, SortOrder::Descending)
        };
        let ranks = rank();
        assert_eq!(ranks["x2"], 1);
        assert_eq!(ranks["x1"], 2);
        assert_eq!(ranks["x3"], 3);
        assert_eq!(ranks["y2"], 1);
        assert_eq!(ranks["y1"], 2);
        assert_eq!(rank(), ranks);
    }

    #[test]
    fn test_rank_ascending() {
        let posts = vec![("a", 3), ("b", 1), ("c", 2)];
        let ranks = rank_within_group(&posts, |p| p.0, |_| (), |p| p.1, SortOrder::Ascending);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 2);
        assert_eq!(ranks["a"], 3);
    }

    #[test]
    fn test_bucket_tiers() {
        assert_eq!(bucket(1000, &TIERS), Some(&"Viral"));
        assert_eq!(bucket(999, &TIERS), Some(&"Popular"));
        assert_eq!(bucket(10, &TIERS), Some(&"Good"));
        assert_eq!(bucket(5, &TIERS), Some(&"Low"));
        assert_eq!(bucket(-40, &TIERS), Some(&"Low"));
    }

    #[test]
    fn test_bucket_unordered_thresholds_and_no_match() {
        let thresholds = [(10.0, "mid"), (100.0, "high")];
        assert_eq!(bucket(150.0, &thresholds), Some(&"high"));
        assert_eq!(bucket(10.0, &thresholds), Some(&"mid"));
        assert_eq!(bucket(9.9, &thresholds), None);
    }

    #[test]
    fn test_fraction_and_distinct() {
        assert_eq!(fraction(1, 4), Some(0.25));
        assert_eq!(fraction(0, 0), None);
        assert_eq!(
            distinct_count(vec![Some("a"), None, Some("b"), Some("a")]),
            2
        );
    }

    #[test]
    fn test_sort_by_float_puts_undefined_last() {
        let mut rows = vec![Some(1.0), None, Some(f64::NAN), Some(3.0)];
        sort_by_float(&mut rows, |v| *v, SortOrder::Descending);
        assert_eq!(rows[0], Some(3.0));
        assert_eq!(rows[1], Some(1.0));
        assert!(rows[2].map_or(true, f64::is_nan));
        assert!(rows[3].map_or(true, f64::is_nan));
    }
}
