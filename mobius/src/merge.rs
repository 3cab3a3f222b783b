//! Merging several metrics into grouped series.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::metric::Metric;
use crate::point::PointSet;
use crate::tag::TagValue;

/// How [`merge_metrics`] groups its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// Group by base name.
    Name,
    /// Group by unique name (base name and tags).
    Unique,
    /// Group by the value of one tag.
    Tag(String),
}

impl FromStr for GroupBy {
    type Err = std::convert::Infallible;

    /// `name` and `unique` select those groupings; anything else is a tag key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            "unique" => Self::Unique,
            tag => Self::Tag(tag.to_string()),
        })
    }
}

impl From<&str> for GroupBy {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(group_by) => group_by,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Unique => f.write_str("unique"),
            Self::Tag(key) => f.write_str(key),
        }
    }
}

impl GroupBy {
    /// Returns the key of the group `metric` belongs to.
    ///
    /// Metrics without the grouping tag all fall into the `""` group.
    pub fn group_key(&self, metric: &Metric) -> String {
        match self {
            Self::Name => metric.name().to_string(),
            Self::Unique => metric.unique_name(),
            Self::Tag(key) => metric
                .tag(key)
                .map(|value| format!("tag:{key}:{value}"))
                .unwrap_or_default(),
        }
    }
}

/// Merges `metrics` into one metric per group.
///
/// Each merged metric is named after the longest common prefix of its
/// members' names (trimmed of `.` and `,`), carries the union of their tags
/// (differing values become an array in first-seen order), and holds every
/// member point sorted by timestamp. Groups without points are dropped.
/// Output is ordered by group key.
///
/// # Examples
///
/// ```rust
/// use mobius::{merge_metrics, GroupBy, Metric};
///
/// let mut a = Metric::new("app.requests.get:host=a");
/// let mut b = Metric::new("app.requests.post:host=b");
/// a.push(2, 1.0);
/// b.push(1, 1.0);
///
/// let merged = merge_metrics(&[a, b], &GroupBy::Tag("missing".into()));
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].name(), "app.requests");
/// assert_eq!(merged[0].points().timestamps(), vec![1, 2]);
/// ```
pub fn merge_metrics(metrics: &[Metric], group_by: &GroupBy) -> Vec<Metric> {
    let mut groups: BTreeMap<String, Vec<&Metric>> = BTreeMap::new();
    for metric in metrics {
        groups.entry(group_by.group_key(metric)).or_default().push(metric);
    }

    groups
        .into_values()
        .filter_map(|members| merge_group(&members))
        .collect()
}

fn merge_group(members: &[&Metric]) -> Option<Metric> {
    let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
    let name = longest_common_prefix(&names).trim_matches(['.', ',']);

    let mut tags: BTreeMap<String, TagValue> = BTreeMap::new();
    let mut points = PointSet::new();
    for member in members {
        for (key, value) in member.tags() {
            match tags.get_mut(key) {
                Some(existing) => existing.union_with(value),
                None => {
                    tags.insert(key.clone(), value.clone());
                }
            }
        }
        points.extend_from_slice(member.points());
    }

    if points.is_empty() {
        return None;
    }
    points.sort();

    let mut merged = Metric::with_tags(name, tags);
    *merged.points_mut() = points;
    Some(merged)
}

/// Longest common character prefix of `names`.
fn longest_common_prefix<'a>(names: &[&'a str]) -> &'a str {
    let Some((first, rest)) = names.split_first() else {
        return "";
    };

    let mut end = first.len();
    for name in rest {
        end = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8())
            .min(end);
    }
    &first[..end]
}
