use serde::{Deserialize, Serialize};

/// Gauge reading. Applying an update replaces any previous value.
pub type Gauge = f64;

/// Counter delta. Applying an update adds onto any previous value.
pub type Counter = i64;

pub const TYPE_GAUGE: &str = "gauge";
pub const TYPE_COUNTER: &str = "counter";

/// Metric kind as it appears in URL paths and the wire `type` field.
///
/// # Examples
///
/// ```
/// use statrelay_common::types::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "{TYPE_GAUGE}"),
            MetricKind::Counter => write!(f, "{TYPE_COUNTER}"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TYPE_GAUGE => Ok(MetricKind::Gauge),
            TYPE_COUNTER => Ok(MetricKind::Counter),
            _ => Err(format!("unknown metric type: {s}")),
        }
    }
}

/// A single metric value: the closed set of kinds the pipeline moves.
///
/// Every dispatch on gauge-vs-counter matches this enum exhaustively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(Gauge),
    Counter(Counter),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }
}

/// One named update, the unit of a reporting batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: MetricValue,
}

impl MetricSample {
    pub fn gauge(name: impl Into<String>, value: Gauge) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter(name: impl Into<String>, delta: Counter) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_and_displays() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!(MetricKind::Counter.to_string(), "counter");
        assert!("histogram".parse::<MetricKind>().is_err());
    }

    #[test]
    fn sample_constructors_carry_kind() {
        assert_eq!(MetricSample::gauge("a", 1.5).value.kind(), MetricKind::Gauge);
        assert_eq!(
            MetricSample::counter("a", 2).value,
            MetricValue::Counter(2)
        );
    }
}
