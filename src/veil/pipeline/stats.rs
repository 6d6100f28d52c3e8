//! Run statistics

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub runs: u64,
    pub failures: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub last_duration_ms: f64,
    /// Cumulative time per step name
    pub step_durations_ms: BTreeMap<String, f64>,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl PipelineStats {
    pub fn record_step(&mut self, step: &str, duration: Duration) {
        *self
            .step_durations_ms
            .entry(step.to_string())
            .or_default() += millis(duration);
    }

    pub fn record_run(&mut self, input_bytes: usize, output_bytes: Option<usize>, duration: Duration) {
        self.runs += 1;
        self.input_bytes += input_bytes as u64;
        match output_bytes {
            Some(bytes) => self.output_bytes += bytes as u64,
            None => self.failures += 1,
        }
        self.last_duration_ms = millis(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut stats = PipelineStats::default();
        stats.record_run(10, Some(4), Duration::from_millis(2));
        stats.record_run(5, None, Duration::from_millis(1));
        stats.record_step("WrapInFunction", Duration::from_millis(3));
        stats.record_step("WrapInFunction", Duration::from_millis(1));
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.input_bytes, 15);
        assert_eq!(stats.output_bytes, 4);
        assert!((stats.step_durations_ms["WrapInFunction"] - 4.0).abs() < 1e-9);
    }
}
