//! Shared counters and observed-value accumulators.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::observability::Exporter;

/// Count/sum/min/max over every observed value of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Mean of the observed values, zero when nothing was observed.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Thread-safe metric registry.
///
/// Every metric has its own atomic (counters) or its own lock (observed
/// values); callers only contend when they touch the same metric. Counters
/// are monotonic for the life of the registry and there is no reset.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    counters: DashMap<String, AtomicU64>,
    observed: DashMap<String, Mutex<Summary>>,
    exporter: Option<Arc<Exporter>>,
}

impl StatsRegistry {
    /// Registry without an exposition backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that mirrors every update into `exporter`.
    pub fn with_exporter(exporter: Arc<Exporter>) -> Self {
        Self {
            exporter: Some(exporter),
            ..Self::default()
        }
    }

    pub fn exporter(&self) -> Option<&Arc<Exporter>> {
        self.exporter.as_ref()
    }

    /// Atomic +1.
    pub fn inc(&self, name: &str) {
        self.add(name, 1);
    }

    /// Atomic +n.
    pub fn add(&self, name: &str, n: u64) {
        self.bump(name.to_string(), n);
        if let Some(exporter) = &self.exporter {
            exporter.counter(name, &[]).increment(n);
        }
    }

    /// Atomic +n on the `id`-labelled series of `name`.
    pub fn add_for(&self, name: &str, id: &str, n: u64) {
        self.bump(labelled(name, id), n);
        if let Some(exporter) = &self.exporter {
            exporter.counter(name, &[("id", id)]).increment(n);
        }
    }

    fn bump(&self, key: String, n: u64) {
        if let Some(counter) = self.counters.get(&key) {
            counter.fetch_add(n, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(n, Ordering::Relaxed);
    }

    /// Fold `value` into the accumulator for `name`.
    pub fn observe(&self, name: &str, value: f64) {
        // The shard read guard must be gone before `entry` takes the write lock.
        let found = self
            .observed
            .get(name)
            .map(|slot| slot.lock().expect("stats accumulator poisoned").add(value))
            .is_some();
        if !found {
            self.observed
                .entry(name.to_string())
                .and_modify(|slot| slot.lock().expect("stats accumulator poisoned").add(value))
                .or_insert_with(|| Mutex::new(Summary::first(value)));
        }
        if let Some(exporter) = &self.exporter {
            exporter.histogram(name).record(value);
        }
    }

    /// Point-in-time copy of every metric.
    pub fn collect(&self) -> StatsSnapshot {
        let counters = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        let summaries = self
            .observed
            .iter()
            .map(|entry| {
                let summary = *entry.value().lock().expect("stats accumulator poisoned");
                (entry.key().clone(), summary)
            })
            .collect();
        StatsSnapshot { counters, summaries }
    }
}

/// Snapshot key of the `id`-labelled series of `name`.
pub fn labelled(name: &str, id: &str) -> String {
    format!("{name}{{id=\"{id}\"}}")
}

/// Immutable view returned by [`StatsRegistry::collect`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    counters: BTreeMap<String, u64>,
    summaries: BTreeMap<String, Summary>,
}

impl StatsSnapshot {
    /// Counter value, zero when never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Per-identity counter value.
    pub fn counter_for(&self, name: &str, id: &str) -> u64 {
        self.counter(&labelled(name, id))
    }

    pub fn summary(&self, name: &str) -> Option<Summary> {
        self.summaries.get(name).copied()
    }

    /// Flat name → value map, with `_min/_max/_sum/_count` for observed metrics.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = self
            .counters
            .iter()
            .map(|(k, v)| (k.clone(), *v as f64))
            .collect();
        for (name, s) in &self.summaries {
            out.insert(format!("{name}_count"), s.count as f64);
            out.insert(format!("{name}_sum"), s.sum);
            out.insert(format!("{name}_min"), s.min);
            out.insert(format!("{name}_max"), s.max);
        }
        out
    }
}
