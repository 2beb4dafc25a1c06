// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lightweight in-process metrics: counters, gauges, and histograms
//! keyed by name, plus a hierarchical timer for attributing wall-clock
//! time to nested stages (wave -> node -> operator call) and a
//! detector that flags operator calls crossing a slow threshold.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::observability::messages::engine::SlowOperation;
use crate::observability::messages::StructuredLog;

#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn set(&self, v: i64) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct Histogram {
    samples: Mutex<Vec<f64>>,
}

impl Histogram {
    pub fn observe(&self, value: f64) {
        self.samples.lock().push(value);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn mean(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        }
    }

    pub fn percentile(&self, p: f64) -> f64 {
        let mut samples = self.samples.lock().clone();
        if samples.is_empty() {
            return 0.0;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((samples.len() - 1) as f64 * p).round() as usize;
        samples[idx]
    }
}

/// Named counter/gauge/histogram families, created on first use.
#[derive(Default)]
pub struct Metrics {
    counters: DashMap<&'static str, Counter>,
    gauges: DashMap<&'static str, Gauge>,
    histograms: DashMap<&'static str, Histogram>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn counter(&self, name: &'static str) -> dashmap::mapref::one::Ref<'_, &'static str, Counter> {
        self.counters.entry(name).or_default();
        self.counters.get(name).unwrap()
    }

    pub fn gauge(&self, name: &'static str) -> dashmap::mapref::one::Ref<'_, &'static str, Gauge> {
        self.gauges.entry(name).or_default();
        self.gauges.get(name).unwrap()
    }

    pub fn histogram(&self, name: &'static str) -> dashmap::mapref::one::Ref<'_, &'static str, Histogram> {
        self.histograms.entry(name).or_default();
        self.histograms.get(name).unwrap()
    }
}

/// A node in a hierarchical timing tree, identified by an arena index
/// rather than a pointer, so timers can be freely passed across the
/// worker-pool task boundary.
pub struct TimerArena {
    spans: Mutex<Vec<TimerSpan>>,
}

struct TimerSpan {
    label: String,
    parent: Option<usize>,
    start: Instant,
    duration: Option<Duration>,
}

pub type TimerId = usize;

impl Default for TimerArena {
    fn default() -> Self {
        TimerArena { spans: Mutex::new(Vec::new()) }
    }
}

impl TimerArena {
    pub fn new() -> Self {
        TimerArena::default()
    }

    pub fn start(&self, label: impl Into<String>, parent: Option<TimerId>) -> TimerId {
        let mut spans = self.spans.lock();
        spans.push(TimerSpan {
            label: label.into(),
            parent,
            start: Instant::now(),
            duration: None,
        });
        spans.len() - 1
    }

    pub fn stop(&self, id: TimerId) {
        let mut spans = self.spans.lock();
        if let Some(span) = spans.get_mut(id) {
            span.duration = Some(span.start.elapsed());
        }
    }

    /// Renders the tree as a flat list of `(depth, label, duration)`,
    /// depth-first, for logging or export.
    pub fn render(&self) -> Vec<(usize, String, Duration)> {
        let spans = self.spans.lock();
        let mut children: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
        for (i, span) in spans.iter().enumerate() {
            children.entry(span.parent).or_default().push(i);
        }
        let mut out = Vec::new();
        let mut stack: Vec<(usize, usize)> = children.get(&None).cloned().unwrap_or_default().into_iter().map(|i| (i, 0)).collect();
        stack.reverse();
        while let Some((i, depth)) = stack.pop() {
            let span = &spans[i];
            out.push((depth, span.label.clone(), span.duration.unwrap_or_default()));
            if let Some(kids) = children.get(&Some(i)) {
                let mut kids: Vec<(usize, usize)> = kids.iter().map(|k| (*k, depth + 1)).collect();
                kids.reverse();
                stack.extend(kids);
            }
        }
        out
    }
}

/// Flags operator calls whose wall-clock time crosses `threshold`.
pub struct SlowOpDetector {
    threshold: Duration,
}

impl SlowOpDetector {
    pub fn new(threshold: Duration) -> Self {
        SlowOpDetector { threshold }
    }

    pub fn check(&self, node_id: &str, operator: &str, duration: Duration) {
        if duration >= self.threshold {
            SlowOperation {
                node_id,
                operator,
                duration,
                threshold: self.threshold,
            }
            .log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let metrics = Metrics::new();
        metrics.counter("calls").incr();
        metrics.counter("calls").add(4);
        assert_eq!(metrics.counter("calls").get(), 5);
    }

    #[test]
    fn histogram_reports_mean_and_percentile() {
        let hist = Histogram::default();
        for v in [10.0, 20.0, 30.0] {
            hist.observe(v);
        }
        assert_eq!(hist.mean(), 20.0);
        assert_eq!(hist.percentile(1.0), 30.0);
    }

    #[test]
    fn timer_arena_tracks_parent_child_nesting() {
        let arena = TimerArena::new();
        let root = arena.start("wave", None);
        let child = arena.start("node", Some(root));
        arena.stop(child);
        arena.stop(root);
        let rendered = arena.render();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].0, 0);
        assert_eq!(rendered[1].0, 1);
    }
}
