//! Convenience layer for emitting application statistics into a dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::metric::Metric;
use crate::point::now;
use crate::tag::TagValue;

/// Writes counters and gauges stamped with the current time.
///
/// Every metric gets the recorder's prefix prepended to its name and the
/// base tags merged under any per-call tags.
///
/// ```rust
/// use std::sync::Arc;
/// use mobius::{Dataset, Recorder};
///
/// # fn main() -> mobius::Result<()> {
/// let dataset = Arc::new(Dataset::in_memory());
/// let stats = Recorder::new(Arc::clone(&dataset))
///     .with_prefix("app.")
///     .with_base_tag("host", "web1");
///
/// stats.increment("requests", &[("route", "/".into())])?;
/// assert_eq!(dataset.get_names("app.requests:host=web1")?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Recorder {
    dataset: Arc<Dataset>,
    prefix: String,
    base_tags: BTreeMap<String, TagValue>,
}

impl Recorder {
    /// Creates a recorder with no prefix and no base tags.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            prefix: String::new(),
            base_tags: BTreeMap::new(),
        }
    }

    /// Sets the string prepended to every metric name.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Adds a tag applied to every metric.
    #[must_use]
    pub fn with_base_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.base_tags.insert(key.into(), value.into());
        self
    }

    /// Returns the dataset being written to.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Records a count of one.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Dataset::write`].
    pub fn increment(&self, name: &str, tags: &[(&str, TagValue)]) -> Result<()> {
        self.increment_by(name, 1, tags)
    }

    /// Records a count of `count`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Dataset::write`].
    pub fn increment_by(&self, name: &str, count: u32, tags: &[(&str, TagValue)]) -> Result<()> {
        self.record(name, f64::from(count), tags, 0)
    }

    /// Records an instantaneous value.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Dataset::write`].
    pub fn gauge(&self, name: &str, value: f64, tags: &[(&str, TagValue)]) -> Result<()> {
        self.record(name, value, tags, 0)
    }

    /// Records a value that replaces all history: the series keeps only
    /// its newest point.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Dataset::write`].
    pub fn set(&self, name: &str, value: f64, tags: &[(&str, TagValue)]) -> Result<()> {
        self.record(name, value, tags, 1)
    }

    fn record(&self, name: &str, value: f64, tags: &[(&str, TagValue)], max_size: usize) -> Result<()> {
        let syntax = &self.dataset.config().syntax;
        let mut metric = Metric::parse(&format!("{}{name}", self.prefix), syntax).with_max_size(max_size);

        for (key, base) in &self.base_tags {
            if metric.tag(key).is_none() {
                metric.set_tag(key.clone(), base.clone());
            }
        }
        for (key, value) in tags {
            metric.set_tag(*key, value.clone());
        }

        metric.push(now(), value);
        self.dataset.write(&metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Recorder {
        Recorder::new(Arc::new(Dataset::in_memory()))
            .with_prefix("svc.")
            .with_base_tag("env", "prod")
    }

    #[test]
    fn test_increment_applies_prefix_and_tags() {
        let stats = recorder();
        stats.increment("hits", &[]).unwrap();
        stats.increment_by("hits", 4, &[]).unwrap();

        let names = stats.dataset().get_names("svc.hits").unwrap();
        assert_eq!(names, vec!["svc.hits:env=prod"]);

        let series = stats.dataset().range(None, None, &["svc.hits"]).unwrap();
        let total: f64 = series[0].points().values().iter().sum();
        // both writes may land on the same nanosecond and overwrite
        assert!(total == 5.0 || total == 4.0);
    }

    #[test]
    fn test_call_tags_override_base_tags() {
        let stats = recorder();
        stats.gauge("load", 0.75, &[("env", "staging".into())]).unwrap();
        assert_eq!(
            stats.dataset().get_names("svc.load").unwrap(),
            vec!["svc.load:env=staging"]
        );
    }

    #[test]
    fn test_set_keeps_only_newest_point() {
        let stats = recorder();
        for value in [1.0, 2.0, 3.0] {
            stats.set("version", value, &[]).unwrap();
        }
        assert_eq!(stats.dataset().num_points("svc.version").unwrap(), 1);

        let newest = stats.dataset().newest(&["svc.version"]).unwrap();
        assert_eq!(newest[0].points().values(), vec![3.0]);
    }
}
