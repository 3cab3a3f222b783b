//! Metrics: a base name, a set of typed tags, and the points recorded for them.
//!
//! A metric's identity in a [`crate::Dataset`] is its *unique name*: the base
//! name followed by the tag pairs sorted by key. Two metrics built from the
//! same tags in a different order share a unique name.
//!
//! ```text
//! cpu.usage:host=web1,core={0,1}
//! └───┬───┘│└────────┬─────────┘
//!   name   │     tag clause
//!      delimiter
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::point::{Point, PointSet, Timestamp};
use crate::reducer::Reducer;
use crate::tag::TagValue;

/// Characters that can never be used as a delimiter or separator.
const RESERVED: &[char] = &['=', '|', '{', '}', '.', '*', '?'];

/// The characters that split a raw name into its base name and tag clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameSyntax {
    /// Separates the base name from the tag clause.
    pub delimiter: char,
    /// Separates `key=value` items within the tag clause.
    pub separator: char,
}

impl Default for NameSyntax {
    fn default() -> Self {
        Self {
            delimiter: ':',
            separator: ',',
        }
    }
}

impl NameSyntax {
    /// The legacy form where the name and every tag are comma separated
    /// (`cpu,host=web1,core=0`).
    pub const LEGACY: Self = Self {
        delimiter: ',',
        separator: ',',
    };

    /// Validates that neither character collides with tag or pattern syntax.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSyntax`] if the delimiter or separator
    /// is whitespace or one of `= | { } . * ?`.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (role, c) in [("delimiter", self.delimiter), ("separator", self.separator)] {
            if c.is_whitespace() || RESERVED.contains(&c) {
                return Err(ConfigError::InvalidSyntax {
                    reason: format!("{role} '{c}' is reserved"),
                });
            }
        }
        Ok(())
    }

    /// Splits a raw name into its base name and tags.
    ///
    /// The clause after the first delimiter is split on the separator,
    /// ignoring separators inside `{...}`. Each item must be `key=value`;
    /// a single malformed item discards the whole clause. Items with an
    /// empty value are skipped.
    pub fn parse(&self, raw: &str) -> (String, BTreeMap<String, TagValue>) {
        let raw = raw.trim();
        let Some((name, clause)) = raw.split_once(self.delimiter) else {
            return (raw.to_string(), BTreeMap::new());
        };

        let mut tags = BTreeMap::new();
        for item in split_outside_braces(clause, self.separator) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let Some((key, value)) = item.split_once('=') else {
                warn!(name = raw, item, "tag item has no '=', ignoring tags");
                return (name.to_string(), BTreeMap::new());
            };
            let key = key.trim();
            if key.is_empty() {
                warn!(name = raw, item, "tag item has an empty key, ignoring tags");
                return (name.to_string(), BTreeMap::new());
            }

            if let Some(value) = TagValue::infer_multi(value) {
                tags.insert(key.to_string(), value);
            }
        }

        (name.to_string(), tags)
    }

    /// Renders a base name and tags as a unique name.
    pub fn render(&self, name: &str, tags: &BTreeMap<String, TagValue>) -> String {
        if tags.is_empty() {
            return name.to_string();
        }

        let mut out = String::with_capacity(name.len() + tags.len() * 16);
        out.push_str(name);
        out.push(self.delimiter);
        for (i, (key, value)) in tags.iter().enumerate() {
            if i > 0 {
                out.push(self.separator);
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
        }
        out
    }

    /// Returns true if rendering `name` and `tags` and parsing the result
    /// gives back the same name and the same rendered scalars per key.
    ///
    /// The tag index is keyed by rendered scalar, so a type change such as
    /// `Float(1.0)` re-parsing as `Int(1)` still counts as a round trip.
    pub fn round_trips(&self, name: &str, tags: &BTreeMap<String, TagValue>) -> bool {
        let (parsed_name, parsed_tags) = self.parse(&self.render(name, tags));
        parsed_name == name
            && parsed_tags.len() == tags.len()
            && tags.iter().zip(&parsed_tags).all(|((key, value), (parsed_key, parsed))| {
                key == parsed_key && rendered_scalars(value) == rendered_scalars(parsed)
            })
    }
}

fn rendered_scalars(value: &TagValue) -> Vec<String> {
    value.scalars().iter().map(ToString::to_string).collect()
}

/// Splits `s` on `sep` except inside brace groups.
pub(crate) fn split_outside_braces(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// A named, tagged sequence of points.
///
/// # Examples
///
/// ```rust
/// use mobius::Metric;
///
/// let mut a = Metric::new("cpu.usage:host=web1,core=0");
/// let b = Metric::new("cpu.usage:core=0,host=web1");
/// assert_eq!(a.unique_name(), b.unique_name());
///
/// a.push(1_000, 0.5);
/// assert_eq!(a.points().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metric {
    name: String,
    tags: BTreeMap<String, TagValue>,
    points: PointSet,
    max_size: Option<usize>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Metric {
    /// Parses `raw` with the default [`NameSyntax`].
    pub fn new(raw: &str) -> Self {
        Self::parse(raw, &NameSyntax::default())
    }

    /// Parses `raw` with the given syntax.
    pub fn parse(raw: &str, syntax: &NameSyntax) -> Self {
        let (name, tags) = syntax.parse(raw);
        Self {
            name,
            tags,
            ..Self::default()
        }
    }

    /// Creates a metric from an already-split name and tags.
    pub fn with_tags(name: impl Into<String>, tags: BTreeMap<String, TagValue>) -> Self {
        Self {
            name: name.into(),
            tags,
            ..Self::default()
        }
    }

    /// Bounds the number of points held; `0` means unbounded.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.set_max_size(max_size);
        self
    }

    /// Sets the maximum number of points held; `0` means unbounded.
    ///
    /// Existing points beyond the bound are dropped oldest-first.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = (max_size > 0).then_some(max_size);
        self.enforce_max_size();
    }

    /// Returns the point bound, if any.
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Returns the base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns every tag, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, TagValue> {
        &self.tags
    }

    /// Returns the value of one tag.
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Sets one tag, replacing any previous value.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<TagValue>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Sets several tags.
    pub fn set_tags<K, V>(&mut self, tags: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<TagValue>,
    {
        for (key, value) in tags {
            self.set_tag(key, value);
        }
    }

    /// Returns the free-form metadata attached to this metric.
    ///
    /// Metadata travels with the JSON form only; a dataset does not store it.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Sets one metadata entry, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Returns the points in push order.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Returns the points mutably.
    pub fn points_mut(&mut self) -> &mut PointSet {
        &mut self.points
    }

    /// Removes and returns every point, leaving the metric empty.
    pub fn reset(&mut self) -> PointSet {
        std::mem::take(&mut self.points)
    }

    /// Returns true if the metric holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends a point, dropping the oldest when over the bound.
    pub fn push(&mut self, timestamp: Timestamp, value: f64) {
        self.push_point(Point::new(timestamp, value));
    }

    /// Appends an existing point.
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
        self.enforce_max_size();
    }

    fn enforce_max_size(&mut self) {
        if let Some(max) = self.max_size
            && self.points.len() > max
        {
            let excess = self.points.len() - max;
            self.points.drain(..excess);
        }
    }

    /// Returns the unique name under the default [`NameSyntax`].
    pub fn unique_name(&self) -> String {
        self.unique_name_with(&NameSyntax::default())
    }

    /// Returns the unique name under the given syntax.
    pub fn unique_name_with(&self, syntax: &NameSyntax) -> String {
        syntax.render(&self.name, &self.tags)
    }

    /// Reduces the metric's values with each reducer, in order.
    pub fn summarize(&self, reducers: &[Reducer]) -> Vec<f64> {
        crate::reducer::summarize_metric(self, reducers)
    }

    /// Buckets the points into windows `width` nanoseconds wide and reduces
    /// each window to one point.
    #[must_use]
    pub fn consolidate(&self, width: u64, reducer: Reducer) -> Metric {
        crate::consolidate::consolidate_metric(self, width, reducer)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_name())
    }
}

#[derive(Serialize)]
struct MetricRef<'a> {
    name: &'a str,
    unique_name: String,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a BTreeMap<String, TagValue>,
    #[serde(skip_serializing_if = "no_points")]
    points: &'a PointSet,
    #[serde(skip_serializing_if = "no_metadata")]
    metadata: &'a BTreeMap<String, serde_json::Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde passes a reference to the field
fn no_tags(tags: &&BTreeMap<String, TagValue>) -> bool {
    tags.is_empty()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_points(points: &&PointSet) -> bool {
    points.is_empty()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_metadata(metadata: &&BTreeMap<String, serde_json::Value>) -> bool {
    metadata.is_empty()
}

#[derive(Deserialize)]
struct MetricOwned {
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, TagValue>,
    #[serde(default)]
    points: PointSet,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        MetricRef {
            name: &self.name,
            unique_name: self.unique_name(),
            tags: &self.tags,
            points: &self.points,
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let owned = MetricOwned::deserialize(deserializer)?;
        Ok(Self {
            name: owned.name,
            tags: owned.tags,
            points: owned.points,
            max_size: None,
            metadata: owned.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_infers_tag_types() {
        let m = Metric::new("foo.bar.baz:a=1,b=true,c=1.25,d=web,e={1,2}");
        assert_eq!(m.name(), "foo.bar.baz");
        assert_eq!(m.tag("a"), Some(&TagValue::Int(1)));
        assert_eq!(m.tag("b"), Some(&TagValue::Bool(true)));
        assert_eq!(m.tag("c"), Some(&TagValue::Float(1.25)));
        assert_eq!(m.tag("d"), Some(&TagValue::from("web")));
        assert_eq!(
            m.tag("e"),
            Some(&TagValue::Array(vec![1i64.into(), 2i64.into()]))
        );
    }

    #[test]
    fn test_parse_without_tags() {
        let m = Metric::new("foo.bar");
        assert_eq!(m.name(), "foo.bar");
        assert!(m.tags().is_empty());
        assert_eq!(m.unique_name(), "foo.bar");

        let m = Metric::new("foo.bar:");
        assert_eq!(m.name(), "foo.bar");
        assert!(m.tags().is_empty());
    }

    #[test]
    fn test_malformed_item_discards_all_tags() {
        let m = Metric::new("foo:a=1,oops,b=2");
        assert_eq!(m.name(), "foo");
        assert!(m.tags().is_empty());

        let m = Metric::new("foo:=1");
        assert!(m.tags().is_empty());
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let m = Metric::new("foo:a=,b=2");
        assert_eq!(m.tags().len(), 1);
        assert_eq!(m.tag("b"), Some(&TagValue::Int(2)));
    }

    #[test]
    fn test_legacy_syntax() {
        let m = Metric::parse("foo.bar,instance=1,class=onesies", &NameSyntax::LEGACY);
        assert_eq!(m.name(), "foo.bar");
        assert_eq!(m.tag("instance"), Some(&TagValue::Int(1)));
        assert_eq!(
            m.unique_name_with(&NameSyntax::LEGACY),
            "foo.bar,class=onesies,instance=1"
        );
    }

    #[test]
    fn test_unique_name_sorts_and_renders_arrays() {
        let m = Metric::new("cpu:z=last,a={x,y},m=2");
        assert_eq!(m.unique_name(), "cpu:a=x|y,m=2,z=last");
        // a unique name parses back to itself
        assert_eq!(Metric::new(&m.unique_name()).unique_name(), m.unique_name());
    }

    #[test]
    fn test_validate_rejects_reserved_characters() {
        assert!(NameSyntax::default().validate().is_ok());
        assert!(NameSyntax::LEGACY.validate().is_ok());

        let bad = NameSyntax {
            delimiter: '.',
            separator: ',',
        };
        assert!(bad.validate().is_err());
        let bad = NameSyntax {
            delimiter: ':',
            separator: '|',
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_push_respects_max_size() {
        let mut m = Metric::new("foo").with_max_size(3);
        for i in 0..10u64 {
            m.push(i, i as f64);
        }
        assert_eq!(m.points().timestamps(), vec![7, 8, 9]);

        m.set_max_size(0);
        m.push(10, 10.0);
        assert_eq!(m.points().len(), 4);
    }

    #[test]
    fn test_reset_takes_points() {
        let mut m = Metric::new("foo");
        m.push(1, 1.0);
        m.push(2, 2.0);
        let taken = m.reset();
        assert_eq!(taken.len(), 2);
        assert!(m.is_empty());
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let m = Metric::new("foo");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"name":"foo","unique_name":"foo"}"#);

        let mut m = Metric::new("foo:host=a");
        m.push(5, 1.5);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["unique_name"], "foo:host=a");
        assert_eq!(json["tags"]["host"], "a");
        assert_eq!(json["points"][0]["time"], 5);

        let back: Metric = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_round_trips_detects_lossy_tags() {
        let syntax = NameSyntax::default();
        let mut tags = BTreeMap::new();
        tags.insert("host".to_string(), TagValue::from("web1"));
        tags.insert("ratio".to_string(), TagValue::Float(2.0));
        tags.insert("zone".to_string(), TagValue::Array(vec!["a".into(), "b".into()]));
        assert!(syntax.round_trips("cpu", &tags));

        for bad in ["/a,b", "a|b", "{a}", " padded", "True", ""] {
            let mut lossy = tags.clone();
            lossy.insert("path".to_string(), TagValue::from(bad));
            assert!(!syntax.round_trips("cpu", &lossy), "{bad:?}");
        }
        assert!(!syntax.round_trips("cpu:usage", &BTreeMap::new()));
        assert!(!NameSyntax::LEGACY.round_trips("cpu,usage", &tags));
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let mut m = Metric::new("foo:host=a");
        m.set_metadata("owner", "infra");
        m.set_metadata("sla", serde_json::json!({"p99_ms": 250}));

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["metadata"]["owner"], "infra");
        assert_eq!(json["metadata"]["sla"]["p99_ms"], 250);
        assert_eq!(m.unique_name(), "foo:host=a");

        let back: Metric = serde_json::from_value(json).unwrap();
        assert_eq!(back.metadata(), m.metadata());
    }

    fn tag_pairs() -> impl Strategy<Value = (Vec<(String, String)>, Vec<(String, String)>)> {
        prop::collection::btree_map("[a-z]{1,6}", "[a-z][a-z0-9]{0,5}", 0..8).prop_flat_map(|m| {
            let pairs: Vec<(String, String)> = m.into_iter().collect();
            (Just(pairs.clone()), Just(pairs).prop_shuffle())
        })
    }

    fn raw_name(pairs: &[(String, String)]) -> String {
        let clause: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("svc.requests:{}", clause.join(","))
    }

    proptest! {
        #[test]
        fn prop_unique_name_ignores_tag_order((ordered, shuffled) in tag_pairs()) {
            let a = Metric::new(&raw_name(&ordered));
            let b = Metric::new(&raw_name(&shuffled));
            prop_assert_eq!(a.unique_name(), b.unique_name());

            let mut c = Metric::new("svc.requests");
            c.set_tags(shuffled.iter().map(|(k, v)| (k.clone(), TagValue::infer(v))));
            prop_assert_eq!(c.unique_name(), a.unique_name());
        }
    }
}
