//! Time-bucket consolidation for mobius metrics.
//!
//! Consolidation downsamples a series by dividing its points into windows of
//! a fixed width and reducing each window to a single point.
//!
//! # Bucketing
//!
//! Buckets are anchored at the newest point and walk backwards:
//!
//! ```text
//!        boundary = t[n-1] - width
//!              │
//!  ... t[k] ───┼── t[k+1] ... t[n-1]
//!              │   └──── bucket ────┘
//!              └─ t[k] <= boundary closes the bucket;
//!                 next boundary = t[k] - width
//! ```
//!
//! Every bucket holds at least one point, and concatenating the buckets
//! in order yields the input (sorted).

use crate::metric::Metric;
use crate::point::PointSet;
use crate::reducer::Reducer;

/// Splits `points` into windows `width` nanoseconds wide, oldest first.
///
/// `points` should be ascending by timestamp; an unsorted input is sorted
/// first. A `width` of zero puts every point in its own bucket.
///
/// # Examples
///
/// ```rust
/// use mobius::consolidate::make_time_buckets;
/// use mobius::{Point, PointSet};
///
/// let points: PointSet = (0..10u64).map(|i| Point::new(i, i as f64)).collect();
/// let buckets = make_time_buckets(&points, 4);
///
/// let sizes: Vec<usize> = buckets.iter().map(|b| b.len()).collect();
/// assert_eq!(sizes, vec![2, 4, 4]);
/// ```
pub fn make_time_buckets(points: &PointSet, width: u64) -> Vec<PointSet> {
    let mut sorted = points.clone();
    if !sorted.is_sorted() {
        sorted.sort();
    }

    let Some(anchor) = sorted.newest() else {
        return Vec::new();
    };

    let mut buckets = Vec::new();
    let mut current = PointSet::new();
    let mut boundary = anchor.timestamp.checked_sub(width);

    for i in (0..sorted.len()).rev() {
        current.push(sorted[i]);

        if i == 0 {
            break;
        }
        let previous = sorted[i - 1].timestamp;
        if boundary.is_some_and(|b| previous <= b) {
            current.reverse();
            buckets.push(std::mem::take(&mut current));
            boundary = previous.checked_sub(width);
        }
    }

    if !current.is_empty() {
        current.reverse();
        buckets.push(current);
    }

    buckets.reverse();
    buckets
}

/// Reduces each time bucket of `metric` to one point.
///
/// Each output point carries the bucket's newest timestamp. The result keeps
/// the input's name and tags.
pub fn consolidate_metric(metric: &Metric, width: u64, reducer: Reducer) -> Metric {
    let mut out = Metric::with_tags(metric.name(), metric.tags().clone());

    for bucket in make_time_buckets(metric.points(), width) {
        let Some(newest) = bucket.newest() else {
            continue;
        };
        out.push(newest.timestamp, reducer.apply(&bucket.values()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    const SECOND: u64 = 1_000_000_000;
    /// 2006-01-02T15:04:00-07:00
    const BASE: u64 = 1_136_239_440 * SECOND;

    fn hundred_seconds() -> Metric {
        let mut metric = Metric::new("mobius.test.metrics.consolidate");
        for i in 0..100u32 {
            metric.push(BASE + u64::from(i) * SECOND, f64::from(i));
        }
        metric
    }

    #[test]
    fn test_empty_input_has_no_buckets() {
        assert!(make_time_buckets(&PointSet::new(), 10).is_empty());
    }

    #[test]
    fn test_buckets_are_non_empty_and_concatenate_to_input() {
        let metric = hundred_seconds();
        for width in [1, 7, 30, 99, 1000].map(|s| s * SECOND) {
            let buckets = make_time_buckets(metric.points(), width);
            assert!(buckets.iter().all(|b| !b.is_empty()), "width={width}");

            let flat: Vec<Point> = buckets.into_iter().flatten().collect();
            assert_eq!(&flat, &metric.points()[..], "width={width}");
        }
    }

    #[test]
    fn test_thirty_second_buckets() {
        let metric = hundred_seconds();

        for (reducer, expected) in [
            (Reducer::Sum, [45.0, 735.0, 1635.0, 2535.0]),
            (Reducer::Minimum, [0.0, 10.0, 40.0, 70.0]),
            (Reducer::Maximum, [9.0, 39.0, 69.0, 99.0]),
            (Reducer::Mean, [4.5, 24.5, 54.5, 84.5]),
        ] {
            let consolidated = metric.consolidate(30 * SECOND, reducer);
            assert_eq!(consolidated.name(), metric.name());
            assert_eq!(consolidated.points().values(), expected.to_vec(), "{reducer}");
            assert_eq!(
                consolidated.points().timestamps(),
                [9, 39, 69, 99].map(|s| BASE + s * SECOND).to_vec()
            );
        }
    }

    #[test]
    fn test_boundary_before_epoch_never_closes() {
        let points: PointSet = (0..10u64).map(|i| Point::new(i, 1.0)).collect();
        let buckets = make_time_buckets(&points, 100);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 10);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let points: PointSet =
            vec![Point::new(20, 2.0), Point::new(0, 0.0), Point::new(10, 1.0)].into();
        let buckets = make_time_buckets(&points, 10);
        let timestamps: Vec<Vec<u64>> = buckets.iter().map(PointSet::timestamps).collect();
        assert_eq!(timestamps, vec![vec![0], vec![10], vec![20]]);
    }

    #[test]
    fn test_consolidate_keeps_tags() {
        let mut metric = Metric::new("cpu:host=a");
        metric.push(1, 1.0);
        metric.push(2, 3.0);

        let out = consolidate_metric(&metric, 10, Reducer::Mean);
        assert_eq!(out.unique_name(), "cpu:host=a");
        assert_eq!(out.points().values(), vec![2.0]);
    }
}
