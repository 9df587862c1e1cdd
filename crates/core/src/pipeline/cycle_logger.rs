use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Observer for detection-loop events.
///
/// Keeps timing and counting out of the loop itself so the daemon, `--once`
/// runs and tests can each choose how much they care about.
pub trait CycleLogger: Send {
    /// Record how long a named stage took in the current cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces found).
    fn metric(&mut self, name: &str, value: f64);

    /// Count one finished cycle under its outcome label.
    fn cycle(&mut self, outcome: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullCycleLogger;

impl CycleLogger for NullCycleLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn cycle(&mut self, _outcome: &str) {}
}

/// Running aggregate of one named series. Constant size however many
/// samples are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesStats {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates per-stage timings, metrics and outcome counts, and writes
/// a summary through `log` when the loop stops.
pub struct LogCycleLogger {
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    outcomes: BTreeMap<String, usize>,
    cycles: usize,
    start_time: Instant,
}

impl LogCycleLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            outcomes: BTreeMap::new(),
            cycles: 0,
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no cycle ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.cycles == 0 {
            return None;
        }

        let uptime = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Detection summary ({} cycles, {uptime:.1}s uptime):",
            self.cycles
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms",
                stats.average(),
                stats.max
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].average()));
        }

        let outcomes: Vec<String> = self
            .outcomes
            .iter()
            .map(|(label, count)| format!("{label} {count}"))
            .collect();
        lines.push(format!("  outcomes: {}", outcomes.join(", ")));

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    pub fn outcome_count(&self, label: &str) -> usize {
        self.outcomes.get(label).copied().unwrap_or(0)
    }
}

impl Default for LogCycleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleLogger for LogCycleLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn cycle(&mut self, outcome: &str) {
        self.cycles += 1;
        *self.outcomes.entry(outcome.to_string()).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
