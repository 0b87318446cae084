//! In-process metrics collector. Grounded in
//! `original_source/src/core/metrics.py`'s `MetricsCollector`: bounded
//! per-key samples for percentile estimates, plus simple counters.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const SAMPLE_WINDOW: usize = 256;

#[derive(Debug, Default, Clone)]
pub struct Stat {
    pub count: u64,
    pub total: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    samples: Vec<f64>,
}

impl Stat {
    fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.total += value;
        self.last = value;
        if self.samples.len() >= SAMPLE_WINDOW {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
        sorted[idx]
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    timers: HashMap<String, Stat>,
    counters: HashMap<String, u64>,
    tick_duration: Stat,
    tick_jitter: Stat,
    http: Stat,
}

impl MetricsCollector {
    pub fn record_tick(&mut self, duration: Duration, jitter: Duration) {
        self.tick_duration.record(duration.as_secs_f64());
        self.tick_jitter.record(jitter.as_secs_f64());
    }

    pub fn record_http(&mut self, duration: Duration) {
        self.http.record(duration.as_secs_f64());
    }

    pub fn record_timer(&mut self, name: &str, duration: Duration) {
        self.timers
            .entry(name.to_string())
            .or_default()
            .record(duration.as_secs_f64());
    }

    pub fn increment_event(&mut self, name: &str, by: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += by;
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tick_duration": {
                "count": self.tick_duration.count,
                "mean": self.tick_duration.mean(),
                "p95": self.tick_duration.percentile(0.95),
                "max": self.tick_duration.max,
            },
            "tick_jitter": {
                "count": self.tick_jitter.count,
                "mean": self.tick_jitter.mean(),
                "p95": self.tick_jitter.percentile(0.95),
                "max": self.tick_jitter.max,
            },
            "counters": self.counters,
        })
    }
}

lazy_static! {
    pub static ref METRICS: Mutex<MetricsCollector> = Mutex::new(MetricsCollector::default());
}

pub fn record_tick(duration: Duration, jitter: Duration) {
    METRICS.lock().unwrap().record_tick(duration, jitter);
}

pub fn record_timer(name: &str, duration: Duration) {
    METRICS.lock().unwrap().record_timer(name, duration);
}

pub fn increment_event(name: &str) {
    METRICS.lock().unwrap().increment_event(name, 1);
}

pub fn increment_event_by(name: &str, by: u64) {
    METRICS.lock().unwrap().increment_event(name, by);
}

pub fn snapshot() -> serde_json::Value {
    METRICS.lock().unwrap().snapshot()
}
