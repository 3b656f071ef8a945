use crate::types::{Counter, Gauge, MetricSample, MetricValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-process container for current gauge and counter values.
///
/// This is the unit the agent fills on every poll and the collector
/// persists. The serde representation is also the snapshot-file format: a
/// JSON object with a `gauges` map and a `counters` map.
///
/// A name is assumed not to collide across kinds; the store does not
/// enforce exclusivity, so addressing one name as both kinds yields two
/// independent values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStore {
    #[serde(default)]
    pub gauges: HashMap<String, Gauge>,
    #[serde(default)]
    pub counters: HashMap<String, Counter>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn apply_gauge(&mut self, name: impl Into<String>, value: Gauge) {
        self.gauges.insert(name.into(), value);
    }

    /// Adds onto the stored value, treating an absent key as zero.
    pub fn apply_counter(&mut self, name: impl Into<String>, delta: Counter) {
        *self.counters.entry(name.into()).or_insert(0) += delta;
    }

    /// Applies one update according to its kind.
    pub fn put(&mut self, name: impl Into<String>, value: MetricValue) {
        match value {
            MetricValue::Gauge(v) => self.apply_gauge(name, v),
            MetricValue::Counter(d) => self.apply_counter(name, d),
        }
    }

    /// Current value for a name, counters first.
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        if let Some(delta) = self.counters.get(name) {
            return Some(MetricValue::Counter(*delta));
        }
        self.gauges.get(name).map(|v| MetricValue::Gauge(*v))
    }

    /// Both mappings as owned copies for bulk export.
    pub fn snapshot(&self) -> (HashMap<String, Gauge>, HashMap<String, Counter>) {
        (self.gauges.clone(), self.counters.clone())
    }

    /// The store's contents as a flat batch, gauges first.
    pub fn samples(&self) -> Vec<MetricSample> {
        let mut out = Vec::with_capacity(self.len());
        for (name, value) in &self.gauges {
            out.push(MetricSample::gauge(name.clone(), *value));
        }
        for (name, delta) in &self.counters {
            out.push(MetricSample::counter(name.clone(), *delta));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty() && self.counters.is_empty()
    }
}
