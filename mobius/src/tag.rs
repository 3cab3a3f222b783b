//! Typed tag values and string-to-type inference.
//!
//! Tags arrive as text (inside a metric name or a query filter) and are
//! stored typed. [`TagValue::infer`] is the only place that decides how a
//! string becomes a value; [`TagValue`]'s `Display` is the only place that
//! decides how a value becomes text again. Unique names and the tag-value
//! index both depend on these two staying inverse of each other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used when rendering array values (`a|b|c`).
pub const ARRAY_SEPARATOR: char = '|';

/// A tag value.
///
/// `Array` holds scalar variants only; constructors in this crate never nest
/// arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// `true` or `false`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A finite floating point number.
    Float(f64),
    /// Anything that is not a boolean or a number.
    String(String),
    /// Several scalar values for the same key.
    Array(Vec<TagValue>),
}

impl TagValue {
    /// Infers a scalar value from text.
    ///
    /// Tries, in order: a boolean literal (`true`/`false`, any case), an
    /// `i64`, a finite `f64`, and finally falls back to the string itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mobius::tag::TagValue;
    ///
    /// assert_eq!(TagValue::infer("TRUE"), TagValue::Bool(true));
    /// assert_eq!(TagValue::infer("42"), TagValue::Int(42));
    /// assert_eq!(TagValue::infer("1.25"), TagValue::Float(1.25));
    /// assert_eq!(TagValue::infer("web1"), TagValue::String("web1".into()));
    /// assert_eq!(TagValue::infer("inf"), TagValue::String("inf".into()));
    /// ```
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>()
            && f.is_finite()
        {
            return Self::Float(f);
        }

        Self::String(raw.to_string())
    }

    /// Infers a value that may hold several items.
    ///
    /// `{a,b}` and `a|b` both produce an array; a single item collapses to a
    /// scalar. Empty items are dropped. Returns `None` if nothing is left.
    pub fn infer_multi(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let items: Vec<&str> = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(inner) => inner.split([',', ARRAY_SEPARATOR]).collect(),
            None => raw.split(ARRAY_SEPARATOR).collect(),
        };

        let mut items: Vec<Self> = items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::infer)
            .collect();

        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Self::Array(items)),
        }
    }

    /// Returns true if the value renders as an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Returns the scalar items of this value: itself, or each array element.
    pub fn scalars(&self) -> &[TagValue] {
        match self {
            Self::Array(items) => items,
            scalar => std::slice::from_ref(scalar),
        }
    }

    /// Appends the scalars of `other` that this value does not yet hold.
    ///
    /// A scalar becomes an array once a second distinct value arrives.
    /// First-seen order is preserved.
    pub fn union_with(&mut self, other: &TagValue) {
        for item in other.scalars() {
            if self.scalars().contains(item) {
                continue;
            }
            match &mut *self {
                Self::Array(items) => items.push(item.clone()),
                scalar => {
                    let first = scalar.clone();
                    *scalar = Self::Array(vec![first, item.clone()]);
                }
            }
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{ARRAY_SEPARATOR}")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_order() {
        assert_eq!(TagValue::infer("false"), TagValue::Bool(false));
        assert_eq!(TagValue::infer("1"), TagValue::Int(1));
        assert_eq!(TagValue::infer("-7"), TagValue::Int(-7));
        assert_eq!(TagValue::infer("2.5"), TagValue::Float(2.5));
        assert_eq!(TagValue::infer("NaN"), TagValue::String("NaN".into()));
        assert_eq!(TagValue::infer("onesies"), TagValue::String("onesies".into()));
    }

    #[test]
    fn test_infer_multi() {
        assert_eq!(
            TagValue::infer_multi("{1.25,2.75}"),
            Some(TagValue::Array(vec![1.25.into(), 2.75.into()]))
        );
        assert_eq!(
            TagValue::infer_multi("a|b"),
            Some(TagValue::Array(vec!["a".into(), "b".into()]))
        );
        assert_eq!(TagValue::infer_multi("{7}"), Some(TagValue::Int(7)));
        // commas only split inside braces
        assert_eq!(TagValue::infer_multi("a,b"), Some(TagValue::from("a,b")));
        assert_eq!(TagValue::infer_multi(""), None);
        assert_eq!(TagValue::infer_multi("{}"), None);
    }

    #[test]
    fn test_display_round_trips_through_infer() {
        for raw in ["true", "12", "1.25", "web-1", "-0.5"] {
            let value = TagValue::infer(raw);
            assert_eq!(TagValue::infer(&value.to_string()), value, "raw={raw}");
        }

        let array = TagValue::Array(vec![1i64.into(), "x".into()]);
        assert_eq!(array.to_string(), "1|x");
        assert_eq!(TagValue::infer_multi(&array.to_string()), Some(array));
    }

    #[test]
    fn test_union_with_dedups_in_first_seen_order() {
        let mut value = TagValue::from("onesies");
        value.union_with(&"onesies".into());
        assert_eq!(value, TagValue::from("onesies"));

        value.union_with(&"twosies".into());
        value.union_with(&"onesies".into());
        assert_eq!(
            value,
            TagValue::Array(vec!["onesies".into(), "twosies".into()])
        );
    }

    #[test]
    fn test_union_with_array_promotes_scalar_once() {
        let mut value = TagValue::Int(1);
        value.union_with(&TagValue::Array(vec![2i64.into(), 1i64.into(), 3i64.into()]));
        assert_eq!(
            value,
            TagValue::Array(vec![1i64.into(), 2i64.into(), 3i64.into()])
        );
    }

    #[test]
    fn test_scalars() {
        assert_eq!(TagValue::Int(1).scalars(), &[TagValue::Int(1)]);
        let array = TagValue::Array(vec![1i64.into(), 2i64.into()]);
        assert_eq!(array.scalars().len(), 2);
    }
}
