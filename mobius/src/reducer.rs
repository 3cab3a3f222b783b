//! Statistical reducers: functions that collapse a slice of values to one.
//!
//! Reducers never fail. A statistic that is undefined for its input (the
//! mean of nothing, the sample variance of one value) is reported as
//! [`UNDEFINED`], which callers must read as "no data" rather than zero.
//! `count`, `sum`, `first` and `last` are defined for empty input and
//! return `0`.
//!
//! Reducers are addressed by name through [`Reducer::from_name`], which
//! accepts canonical names, short aliases and arbitrary percentiles:
//!
//! | Canonical name                          | Aliases            |
//! |-----------------------------------------|--------------------|
//! | `mean`                                  | `avg`, `average`   |
//! | `maximum` / `minimum`                   | `max` / `min`      |
//! | `standard-deviation`                    | `stddev`           |
//! | `standard-deviation-population`         | `stddevp`          |
//! | `standard-deviation-sample`             | `stddevs`          |
//! | `variance`                              | `var`              |
//! | `population-variance`                   | `pvar`             |
//! | `sample-variance`                       | `svar`             |
//! | `geometric-mean` / `harmonic-mean`      | `gmean` / `hmean`  |
//! | `inter-quartile-range`                  | `iqr`              |
//! | `median-absolute-deviation`             | `mad`              |
//! | `median-absolute-deviation-population`  | `madp`             |
//! | `percent<digits>`                       | `p<digits>`, `lower25`, `upper75` .. `upper9999` |

use std::fmt;

use crate::metric::Metric;

/// Sentinel returned when a statistic is undefined for its input.
pub const UNDEFINED: f64 = f64::NAN;

/// A reduction over a slice of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reducer {
    /// Number of values.
    Count,
    /// First value, or `0` if empty.
    First,
    /// Last value, or `0` if empty.
    Last,
    /// Sum of values, `0` if empty.
    Sum,
    /// Arithmetic mean.
    Mean,
    /// Middle value (mean of the two middle values for even counts).
    Median,
    /// Smallest value.
    Minimum,
    /// Largest value.
    Maximum,
    /// Population standard deviation.
    StandardDeviation,
    /// Population standard deviation.
    StandardDeviationPopulation,
    /// Sample standard deviation (`n - 1` denominator).
    StandardDeviationSample,
    /// Population variance.
    Variance,
    /// Population variance.
    PopulationVariance,
    /// Sample variance (`n - 1` denominator).
    SampleVariance,
    /// The `p`-th percentile, `p` a fraction in `(0, 1]`.
    Percentile(f64),
    /// `n`-th root of the product of values.
    GeometricMean,
    /// Reciprocal of the mean of reciprocals.
    HarmonicMean,
    /// `Q3 - Q1`.
    InterQuartileRange,
    /// Median of absolute deviations from the median.
    MedianAbsoluteDeviation,
    /// Median of absolute deviations from the median.
    MedianAbsoluteDeviationPopulation,
    /// `(Q1 + Q3) / 2`.
    Midhinge,
    /// `(Q1 + 2*Q2 + Q3) / 4`.
    Trimean,
}

/// Fixed names, in lookup order. Percentiles are handled separately.
const NAMES: &[(&str, Reducer)] = &[
    ("count", Reducer::Count),
    ("first", Reducer::First),
    ("last", Reducer::Last),
    ("sum", Reducer::Sum),
    ("mean", Reducer::Mean),
    ("median", Reducer::Median),
    ("minimum", Reducer::Minimum),
    ("maximum", Reducer::Maximum),
    ("standard-deviation", Reducer::StandardDeviation),
    ("standard-deviation-population", Reducer::StandardDeviationPopulation),
    ("standard-deviation-sample", Reducer::StandardDeviationSample),
    ("variance", Reducer::Variance),
    ("population-variance", Reducer::PopulationVariance),
    ("sample-variance", Reducer::SampleVariance),
    ("geometric-mean", Reducer::GeometricMean),
    ("harmonic-mean", Reducer::HarmonicMean),
    ("inter-quartile-range", Reducer::InterQuartileRange),
    ("median-absolute-deviation", Reducer::MedianAbsoluteDeviation),
    (
        "median-absolute-deviation-population",
        Reducer::MedianAbsoluteDeviationPopulation,
    ),
    ("midhinge", Reducer::Midhinge),
    ("trimean", Reducer::Trimean),
];

const ALIASES: &[(&str, &str)] = &[
    ("avg", "mean"),
    ("average", "mean"),
    ("min", "minimum"),
    ("max", "maximum"),
    ("stddev", "standard-deviation"),
    ("stddevp", "standard-deviation-population"),
    ("stddevs", "standard-deviation-sample"),
    ("var", "variance"),
    ("pvar", "population-variance"),
    ("svar", "sample-variance"),
    ("gmean", "geometric-mean"),
    ("hmean", "harmonic-mean"),
    ("iqr", "inter-quartile-range"),
    ("mad", "median-absolute-deviation"),
    ("madp", "median-absolute-deviation-population"),
    ("lower25", "percent25"),
    ("upper75", "percent75"),
    ("upper85", "percent85"),
    ("upper90", "percent90"),
    ("upper95", "percent95"),
    ("upper98", "percent98"),
    ("upper99", "percent99"),
    ("upper9999", "percent9999"),
];

impl Reducer {
    /// Resolves a canonical name or alias, ignoring case.
    ///
    /// Returns `None` for unknown names.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mobius::Reducer;
    ///
    /// assert_eq!(Reducer::from_name("AVG"), Some(Reducer::Mean));
    /// assert_eq!(Reducer::from_name("iqr"), Some(Reducer::InterQuartileRange));
    /// assert_eq!(Reducer::from_name("percent95"), Some(Reducer::Percentile(0.95)));
    /// assert_eq!(Reducer::from_name("p9999"), Some(Reducer::Percentile(0.9999)));
    /// assert_eq!(Reducer::from_name("bogus"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name.as_str(), |(_, canonical)| canonical);

        if let Some((_, reducer)) = NAMES.iter().find(|(n, _)| *n == name) {
            return Some(*reducer);
        }

        let digits = name
            .strip_prefix("percent")
            .or_else(|| name.strip_prefix('p'))?;
        parse_percentile_digits(digits).map(Self::Percentile)
    }

    /// Returns the canonical name of this reducer.
    ///
    /// Percentiles in `(0, 1)` render as `percent<digits>`, which
    /// [`Reducer::from_name`] parses back to the same reducer.
    pub fn name(&self) -> String {
        if let Self::Percentile(p) = self {
            return percentile_name(*p);
        }
        NAMES
            .iter()
            .find(|(_, r)| r == self)
            .map(|(n, _)| (*n).to_string())
            .unwrap_or_default()
    }

    /// Applies this reducer to `values`.
    #[allow(clippy::cast_precision_loss)] // counts far below 2^52
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Self::Count => values.len() as f64,
            Self::First => values.first().copied().unwrap_or(0.0),
            Self::Last => values.last().copied().unwrap_or(0.0),
            Self::Sum => values.iter().sum(),
            Self::Mean => mean(values),
            Self::Median => median(&sorted(values)),
            Self::Minimum => values.iter().copied().reduce(f64::min).unwrap_or(UNDEFINED),
            Self::Maximum => values.iter().copied().reduce(f64::max).unwrap_or(UNDEFINED),
            Self::StandardDeviation | Self::StandardDeviationPopulation => {
                population_variance(values).sqrt()
            }
            Self::StandardDeviationSample => sample_variance(values).sqrt(),
            Self::Variance | Self::PopulationVariance => population_variance(values),
            Self::SampleVariance => sample_variance(values),
            Self::Percentile(p) => percentile(&sorted(values), *p),
            Self::GeometricMean => geometric_mean(values),
            Self::HarmonicMean => harmonic_mean(values),
            Self::InterQuartileRange => {
                let (q1, _, q3) = quartiles(&sorted(values));
                q3 - q1
            }
            Self::MedianAbsoluteDeviation | Self::MedianAbsoluteDeviationPopulation => {
                median_absolute_deviation(values)
            }
            Self::Midhinge => {
                let (q1, _, q3) = quartiles(&sorted(values));
                (q1 + q3) / 2.0
            }
            Self::Trimean => {
                let (q1, q2, q3) = quartiles(&sorted(values));
                (q1 + 2.0 * q2 + q3) / 4.0
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Resolves a name or alias to its canonical name.
///
/// ```rust
/// assert_eq!(mobius::reducer_name("max").as_deref(), Some("maximum"));
/// assert_eq!(mobius::reducer_name("upper95").as_deref(), Some("percent95"));
/// assert_eq!(mobius::reducer_name("nope"), None);
/// ```
pub fn reducer_name(name: &str) -> Option<String> {
    Reducer::from_name(name).map(|r| r.name())
}

/// Applies each reducer, in order, to every value in the metric.
pub fn summarize_metric(metric: &Metric, reducers: &[Reducer]) -> Vec<f64> {
    let values = metric.points().values();
    reducers.iter().map(|r| r.apply(&values)).collect()
}

/// `digits` read as a decimal fraction: `95` is 0.95, `9999` is 0.9999.
fn parse_percentile_digits(digits: &str) -> Option<f64> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let numerator: u32 = digits.parse().ok()?;
    if numerator == 0 {
        return None;
    }
    let exponent = i32::try_from(digits.len()).ok()?;
    Some(f64::from(numerator) / 10f64.powi(exponent))
}

fn percentile_name(p: f64) -> String {
    let rendered = p.to_string();
    match rendered.strip_prefix("0.") {
        Some(frac) if frac.len() == 1 => format!("percent{frac}0"),
        Some(frac) => format!("percent{frac}"),
        None => format!("percentile({rendered})"),
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return UNDEFINED;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => UNDEFINED,
        _ if n % 2 == 0 => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
        _ => sorted[n / 2],
    }
}

fn sum_of_squares(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

#[allow(clippy::cast_precision_loss)]
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return UNDEFINED;
    }
    sum_of_squares(values) / values.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return UNDEFINED;
    }
    sum_of_squares(values) / (values.len() - 1) as f64
}

/// Nearest-rank percentile over sorted input; fractional ranks average the
/// two neighbouring values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() || !(p > 0.0 && p <= 1.0) {
        return UNDEFINED;
    }

    let rank = p * sorted.len() as f64;
    let i = rank as usize;
    if rank.fract() == 0.0 {
        sorted[i - 1]
    } else if rank > 1.0 {
        (sorted[i - 1] + sorted[i]) / 2.0
    } else {
        sorted[0]
    }
}

/// Q1, Q2, Q3 by the halves method: odd counts exclude the median from
/// both halves.
fn quartiles(sorted: &[f64]) -> (f64, f64, f64) {
    let n = sorted.len();
    if n == 0 {
        return (UNDEFINED, UNDEFINED, UNDEFINED);
    }
    let (lower_end, upper_start) = if n % 2 == 0 { (n / 2, n / 2) } else { (n / 2, n / 2 + 1) };
    (
        median(&sorted[..lower_end]),
        median(sorted),
        median(&sorted[upper_start..]),
    )
}

fn median_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return UNDEFINED;
    }
    let m = median(&sorted(values));
    let deviations: Vec<f64> = values.iter().map(|v| (v - m).abs()).collect();
    median(&sorted(&deviations))
}

#[allow(clippy::cast_precision_loss)]
fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|v| *v < 0.0) {
        return UNDEFINED;
    }
    if values.contains(&0.0) {
        return 0.0;
    }
    (values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64).exp()
}

#[allow(clippy::cast_precision_loss)]
fn harmonic_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|v| *v <= 0.0) {
        return UNDEFINED;
    }
    values.len() as f64 / values.iter().map(|v| 1.0 / v).sum::<f64>()
}

#[allow(clippy::cast_precision_loss)]
fn co_moment(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    Some(xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum())
}

/// Sample covariance of two equal-length series.
///
/// Returns [`UNDEFINED`] for mismatched lengths or fewer than two values.
#[allow(clippy::cast_precision_loss)]
pub fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 {
        return UNDEFINED;
    }
    co_moment(xs, ys).map_or(UNDEFINED, |m| m / (xs.len() - 1) as f64)
}

/// Population covariance of two equal-length series.
#[allow(clippy::cast_precision_loss)]
pub fn covariance_population(xs: &[f64], ys: &[f64]) -> f64 {
    co_moment(xs, ys).map_or(UNDEFINED, |m| m / xs.len() as f64)
}

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns [`UNDEFINED`] if either series has zero variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let sx = population_variance(xs).sqrt();
    let sy = population_variance(ys).sqrt();
    if sx == 0.0 || sy == 0.0 {
        return UNDEFINED;
    }
    covariance_population(xs, ys) / (sx * sy)
}
