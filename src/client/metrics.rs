use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// One verify call as seen by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetric {
    pub call_id: u64,
    pub start_time: u64, // milliseconds since epoch
    pub latency_ms: u64,
    /// True when the backend returned a result, whatever the verdict
    pub completed: bool,
    /// Verdict (`pass`, `fail`, `spoof_detected`, ...) or error kind (`timeout`, ...)
    pub outcome: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_calls: usize,
    pub completed_calls: usize,
    pub failed_calls: usize,
    pub failure_rate: f64,

    // Latency statistics over completed calls (milliseconds)
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub latency_p99_ms: u64,

    pub outcomes: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct ClientMetrics {
    client_name: String,
    start_time: Instant,
    calls: Vec<CallMetric>,
}

impl ClientMetrics {
    pub fn new(client_name: String) -> Self {
        Self {
            client_name,
            start_time: Instant::now(),
            calls: Vec::new(),
        }
    }

    pub fn record_call(&mut self, latency: Duration, completed: bool, outcome: &str) {
        let start_time = SystemTime::now()
            .checked_sub(latency)
            .unwrap_or_else(SystemTime::now)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        self.calls.push(CallMetric {
            call_id: self.calls.len() as u64 + 1,
            start_time,
            latency_ms: latency.as_millis() as u64,
            completed,
            outcome: outcome.to_string(),
        });
    }

    pub fn calls(&self) -> &[CallMetric] {
        &self.calls
    }

    pub fn aggregate(&self) -> AggregatedStats {
        let mut stats = AggregatedStats::default();

        if self.calls.is_empty() {
            return stats;
        }

        stats.total_calls = self.calls.len();
        stats.completed_calls = self.calls.iter().filter(|c| c.completed).count();
        stats.failed_calls = stats.total_calls - stats.completed_calls;
        stats.failure_rate = (stats.failed_calls as f64 / stats.total_calls as f64) * 100.0;

        let mut latencies: Vec<u64> = self
            .calls
            .iter()
            .filter(|c| c.completed)
            .map(|c| c.latency_ms)
            .collect();

        if !latencies.is_empty() {
            latencies.sort_unstable();

            stats.latency_min_ms = latencies[0];
            stats.latency_max_ms = latencies[latencies.len() - 1];
            stats.latency_avg_ms =
                latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;

            stats.latency_p50_ms = percentile(&latencies, 50.0);
            stats.latency_p95_ms = percentile(&latencies, 95.0);
            stats.latency_p99_ms = percentile(&latencies, 99.0);
        }

        for call in &self.calls {
            *stats.outcomes.entry(call.outcome.clone()).or_insert(0) += 1;
        }

        stats
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let output = serde_json::json!({
            "client_name": self.client_name,
            "run_duration_secs": self.start_time.elapsed().as_secs(),
            "aggregated_stats": self.aggregate(),
            "calls": self.calls,
        });

        let json_string = serde_json::to_string_pretty(&output)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;

        Ok(())
    }
}

/// Nearest-rank percentile: the smallest value with at least `percentile`% of
/// the samples at or below it.
fn percentile(sorted_data: &[u64], percentile: f64) -> u64 {
    if sorted_data.is_empty() {
        return 0;
    }

    let rank = (percentile / 100.0 * sorted_data.len() as f64).ceil() as usize;
    sorted_data[rank.clamp(1, sorted_data.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(percentile(&data, 50.0), 5);
        assert_eq!(percentile(&data, 51.0), 6);
        assert_eq!(percentile(&data, 90.0), 9);
        assert_eq!(percentile(&data, 95.0), 10);
        assert_eq!(percentile(&data, 100.0), 10);
        assert_eq!(percentile(&data, 0.0), 1);
        assert_eq!(percentile(&[7], 99.0), 7);
        assert_eq!(percentile(&[], 50.0), 0);
    }

    #[test]
    fn test_metrics_aggregation() {
        let mut metrics = ClientMetrics::new("TestClient".to_string());

        metrics.record_call(Duration::from_millis(100), true, "pass");
        metrics.record_call(Duration::from_millis(300), true, "spoof_detected");
        metrics.record_call(Duration::from_millis(5000), false, "timeout");
        metrics.record_call(Duration::from_millis(200), true, "pass");

        let stats = metrics.aggregate();

        assert_eq!(stats.total_calls, 4);
        assert_eq!(stats.completed_calls, 3);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.failure_rate, 25.0);
        assert_eq!(stats.latency_min_ms, 100);
        assert_eq!(stats.latency_max_ms, 300);
        assert_eq!(stats.latency_avg_ms, 200.0);
        assert_eq!(stats.outcomes.get("pass"), Some(&2));
        assert_eq!(stats.outcomes.get("timeout"), Some(&1));
        assert_eq!(metrics.calls()[3].call_id, 4);
    }

    #[test]
    fn test_export_to_json() {
        let mut metrics = ClientMetrics::new("Exporter".to_string());
        metrics.record_call(Duration::from_millis(50), false, "network");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        metrics.export_to_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["client_name"], "Exporter");
        assert_eq!(value["aggregated_stats"]["failed_calls"], 1);
        assert_eq!(value["calls"][0]["outcome"], "network");
    }
}
