//! Result records emitted by a simulation run.

use archsim_core::{ConnectionKind, EdgeId, KeyId, NodeId, NodeType, RunConfig, TableId};
use serde::Serialize;

use crate::bottleneck::{Bottleneck, Severity};
use crate::cache::CacheAnalysis;
use crate::query::QueryAnalysis;
use crate::state::NodeState;

/// Arithmetic mean, 0 for an empty sample set.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// 99th percentile: the ascending-sorted sample at `floor(n * 0.99)`,
/// clamped to the last index. 0 for an empty sample set.
pub fn p99(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let index = ((sorted.len() as f64 * 0.99).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Utilization of a rate against capacity, as a percentage capped at 100.
pub fn cpu_percent(rps: f64, state: &NodeState) -> f64 {
    let max_rps = state.capacity.max_rps();
    if max_rps <= 0.0 {
        return 0.0;
    }
    (rps / max_rps * 100.0).min(100.0)
}

/// Memory held by in-flight requests as a percentage of declared memory.
///
/// In-flight requests are estimated as `rps * average latency` (Little's law).
pub fn memory_percent(rps: f64, state: &NodeState) -> f64 {
    let capacity_mb = state.capacity.memory_capacity_mb();
    if capacity_mb <= 0.0 {
        return 0.0;
    }
    let in_flight = rps * state.average_latency_ms() / 1000.0;
    let used_mb = in_flight * state.capacity.profile.memory_cost_per_request_mb;
    (used_mb / capacity_mb * 100.0).min(100.0)
}

/// Final metrics of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    /// Id of the node.
    pub node_id: NodeId,
    /// Type tag of the node.
    pub node_type: NodeType,
    /// Display label, falling back to the id.
    pub label: String,
    /// Resolved instance count.
    pub instances: u32,
    /// Total capacity across instances, in requests per second.
    pub capacity_rps: f64,
    /// Requests that arrived at the node.
    pub requests_received: u64,
    /// Requests the node completed.
    pub requests_processed: u64,
    /// Received minus processed, never negative.
    pub requests_queued: u64,
    /// Requests dropped by overload.
    pub errors: u64,
    /// Errors over received requests.
    pub error_rate: f64,
    /// Mean latency of processed requests, in milliseconds.
    pub avg_latency_ms: f64,
    /// 99th percentile latency, in milliseconds.
    pub p99_latency_ms: f64,
    /// Received requests over the run duration.
    pub avg_rps: f64,
    /// Arrivals in the last simulated second.
    pub current_rps: u64,
    /// Highest arrivals in any simulated second.
    pub peak_rps: u64,
    /// Average load as a percentage of capacity.
    pub cpu_utilization: f64,
    /// Average in-flight memory as a percentage of declared memory.
    pub memory_utilization: f64,
}

/// Final metrics of one edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetrics {
    /// Id of the edge.
    pub edge_id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Protocol carried by the edge.
    pub kind: ConnectionKind,
    /// Requests that crossed the edge.
    pub request_count: u64,
    /// Bytes accounted for those requests.
    pub bytes_transferred: u64,
    /// Mean latency of the source node for those requests, in milliseconds.
    pub avg_latency_ms: f64,
}

/// Round-trip metrics of one traffic source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointMetrics {
    /// Id of the traffic source.
    pub node_id: NodeId,
    /// Requests issued by the source.
    pub total_requests: u64,
    /// Requests that completed without a drop.
    pub successful_requests: u64,
    /// Requests dropped somewhere along the path.
    pub failed_requests: u64,
    /// Mean round-trip time, in milliseconds.
    pub avg_rtt_ms: f64,
    /// 99th percentile round-trip time, in milliseconds.
    pub p99_rtt_ms: f64,
    /// Successful over total requests, 1 when nothing was sent.
    pub success_rate: f64,
}

/// One node's values within a timeline snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    /// Id of the node.
    pub node_id: NodeId,
    /// Arrivals during this second.
    pub rps: u64,
    /// Mean latency so far, in milliseconds.
    pub avg_latency_ms: f64,
    /// Arrivals as a percentage of capacity.
    pub cpu_percent: f64,
    /// In-flight memory as a percentage of declared memory.
    pub memory_percent: f64,
    /// Errors over received requests so far.
    pub error_rate: f64,
}

/// Aggregated per-node values of one simulated second.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    /// Zero-based index of the second.
    pub second: u32,
    /// Requests issued by traffic sources during this second.
    pub requests: u64,
    /// Values of every simulated node.
    pub nodes: Vec<NodeSnapshot>,
}

/// Cost analysis of the queries reaching one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysisRecord {
    /// Database node owning the table.
    pub node_id: NodeId,
    /// Id of the analyzed table.
    pub table_id: TableId,
    /// Name of the analyzed table.
    pub table_name: String,
    /// Analyzer output.
    #[serde(flatten)]
    pub analysis: QueryAnalysis,
}

/// Effectiveness estimate of one cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAnalysisRecord {
    /// Cache node owning the key.
    pub node_id: NodeId,
    /// Id of the key.
    pub key_id: KeyId,
    /// Key pattern as declared.
    pub pattern: String,
    /// Estimator output.
    #[serde(flatten)]
    pub analysis: CacheAnalysis,
}

/// Complete outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Configuration the run used.
    pub config: RunConfig,
    /// Requests issued by all traffic sources.
    pub total_requests: u64,
    /// Final metrics per simulated node, in diagram order.
    pub nodes: Vec<NodeMetrics>,
    /// Final metrics per edge, in diagram order.
    pub edges: Vec<EdgeMetrics>,
    /// Round-trip metrics per traffic source.
    pub entry_points: Vec<EntryPointMetrics>,
    /// Findings, critical first.
    pub bottlenecks: Vec<Bottleneck>,
    /// One snapshot per simulated second.
    pub timeline: Vec<TimelineSnapshot>,
    /// One record per analyzed database table.
    pub query_analyses: Vec<QueryAnalysisRecord>,
    /// One record per cache key.
    pub cache_analyses: Vec<CacheAnalysisRecord>,
}

impl SimulationResult {
    /// Looks up the metrics of a node by id.
    pub fn node(&self, id: &str) -> Option<&NodeMetrics> {
        self.nodes.iter().find(|n| n.node_id.as_str() == id)
    }

    /// Looks up the metrics of a traffic source by id.
    pub fn entry_point(&self, id: &str) -> Option<&EntryPointMetrics> {
        self.entry_points.iter().find(|e| e.node_id.as_str() == id)
    }

    /// Returns true if any critical bottleneck was detected.
    pub fn has_critical_bottlenecks(&self) -> bool {
        self.bottlenecks
            .iter()
            .any(|b| b.severity == Severity::Critical)
    }

    /// Serializes the result to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - If a value cannot be represented in JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        let seed = self
            .config
            .seed
            .map_or_else(|| "none".to_string(), |s| s.to_string());
        summary.push_str(&format!("Simulation Report (seed: {seed})\n"));
        summary.push_str(&format!(
            "Duration: {}s at {} rps\n",
            self.config.duration_seconds, self.config.requests_per_second
        ));
        summary.push_str(&format!("Total requests: {}\n", self.total_requests));

        summary.push_str("\nEntry points:\n");
        for entry in &self.entry_points {
            summary.push_str(&format!(
                "  {}: {:.1}% success, avg RTT {:.2}ms, p99 RTT {:.2}ms\n",
                entry.node_id,
                entry.success_rate * 100.0,
                entry.avg_rtt_ms,
                entry.p99_rtt_ms
            ));
        }

        summary.push_str("\nNodes:\n");
        for node in &self.nodes {
            summary.push_str(&format!(
                "  {} ({}): {} received, {} errors, avg {:.2}ms, p99 {:.2}ms, peak {} rps\n",
                node.label,
                node.node_type,
                node.requests_received,
                node.errors,
                node.avg_latency_ms,
                node.p99_latency_ms,
                node.peak_rps
            ));
        }

        if !self.bottlenecks.is_empty() {
            summary.push_str("\nBottlenecks:\n");
            for bottleneck in &self.bottlenecks {
                summary.push_str(&format!("  - {bottleneck}\n"));
            }
        }

        let warnings: Vec<_> = self
            .query_analyses
            .iter()
            .flat_map(|q| q.analysis.warnings.iter().map(move |w| (q, w)))
            .collect();
        if !warnings.is_empty() {
            summary.push_str("\nQuery warnings:\n");
            for (query, warning) in warnings {
                summary.push_str(&format!(
                    "  - {}.{}: {} ({})\n",
                    query.node_id, query.table_name, warning.message, warning.suggestion
                ));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::NodeType;
    use proptest::prelude::*;

    use super::*;
    use crate::behavior::{NodeCapacity, profile_for};

    fn api_state(instances: u32, latency_ms: f64) -> NodeState {
        let mut state = NodeState::new(NodeCapacity {
            profile: profile_for(NodeType::ApiServer).unwrap(),
            instances,
        });
        state.record_processed(latency_ms);
        state
    }

    #[test]
    fn test_p99_index_selection() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        // floor(100 * 0.99) = 99 -> the largest sample.
        assert_eq!(p99(&samples), 100.0);

        let samples: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        // floor(10 * 0.99) = 9 -> last index after sorting.
        assert_eq!(p99(&samples), 10.0);

        let samples: Vec<f64> = (1..=200).map(f64::from).collect();
        assert_eq!(p99(&samples), 199.0);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(p99(&[]), 0.0);
        assert_eq!(p99(&[4.0]), 4.0);
    }

    #[test]
    fn test_memory_percent_uses_in_flight_requests() {
        // 500 rps * 0.04 s = 20 in flight, at 2 MB each, against 1024 MB.
        let state = api_state(1, 40.0);
        assert!((memory_percent(500.0, &state) - 3.906_25).abs() < 1e-9);

        // Twice the instances, twice the declared memory.
        let state = api_state(2, 40.0);
        assert!((memory_percent(500.0, &state) - 1.953_125).abs() < 1e-9);

        // 100k rps * 1 s * 2 MB exceeds 1024 MB.
        let state = api_state(1, 1000.0);
        assert_eq!(memory_percent(100_000.0, &state), 100.0);
        assert_eq!(memory_percent(0.0, &state), 0.0);
    }

    #[test]
    fn test_cpu_percent_is_capped() {
        let state = api_state(1, 10.0);
        assert!((cpu_percent(250.0, &state) - 25.0).abs() < 1e-9);
        assert_eq!(cpu_percent(5000.0, &state), 100.0);
    }

    proptest! {
        #[test]
        fn prop_p99_at_least_mean(samples in proptest::collection::vec(0.0f64..10_000.0, 1..100)) {
            prop_assert!(p99(&samples) + 1e-9 >= mean(&samples));
        }
    }
}
