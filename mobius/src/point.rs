//! Timestamped observations and ordered collections of them.

use std::ops::{Deref, DerefMut};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Timestamp type (nanoseconds since the Unix epoch).
pub type Timestamp = u64;

/// Returns the current time as a [`Timestamp`].
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

/// A single observation: a value at an instant.
///
/// Points order by timestamp only; two points with the same timestamp and
/// different values are not distinguished by [`PointSet::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Nanoseconds since the Unix epoch.
    #[serde(rename = "time")]
    pub timestamp: Timestamp,
    /// The observed value.
    pub value: f64,
}

impl Point {
    /// Creates a new point.
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {:.6})", self.timestamp, self.value)
    }
}

/// An ordered sequence of points.
///
/// Point sets returned by [`crate::Dataset`] are always sorted ascending by
/// timestamp. Sets built by callers are kept in push order until
/// [`PointSet::sort`] is called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointSet(Vec<Point>);

impl PointSet {
    /// Creates an empty point set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates an empty point set with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Returns the timestamps of every point, in order.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.0.iter().map(|p| p.timestamp).collect()
    }

    /// Returns the values of every point, in order.
    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.value).collect()
    }

    /// Returns the first point in the set.
    pub fn oldest(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point in the set.
    pub fn newest(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Sorts the set ascending by timestamp (stable).
    pub fn sort(&mut self) {
        self.0.sort_by_key(|p| p.timestamp);
    }

    /// Returns true if the points are in non-decreasing timestamp order.
    pub fn is_sorted(&self) -> bool {
        self.0.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Consumes the set and returns the underlying vector.
    pub fn into_inner(self) -> Vec<Point> {
        self.0
    }
}

impl Deref for PointSet {
    type Target = Vec<Point>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PointSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Point>> for PointSet {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PointSet {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
