//! Post-run bottleneck detection.
//!
//! Each rule inspects the final counters of one node and may report a
//! finding. Rules are independent, so a single node can collect several.

use std::cmp::Reverse;
use std::fmt;

use archsim_core::{Node, NodeId};
use serde::Serialize;
use tracing::warn;

use crate::state::{NodeState, RunState};
use crate::topology::TopologyGraph;

/// Utilization above which capacity findings become warnings.
const CAPACITY_WARNING_RATIO: f64 = 0.8;

/// Target utilization used when suggesting instance counts.
const TARGET_UTILIZATION: f64 = 0.7;

/// Category of a bottleneck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    /// Average load at or above the warning share of capacity.
    CpuOverload,
    /// Peaks or drops showing that requests pile up.
    QueueBuildup,
    /// Average latency well above the expected base latency.
    HighLatency,
}

impl fmt::Display for BottleneckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BottleneckKind::CpuOverload => write!(f, "cpu_overload"),
            BottleneckKind::QueueBuildup => write!(f, "queue_buildup"),
            BottleneckKind::HighLatency => write!(f, "high_latency"),
        }
    }
}

/// Severity of a bottleneck. Orders `Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Worth watching before load grows.
    Warning,
    /// Needs action before the design ships.
    Critical,
}

/// A detected capacity, latency or error-rate problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    /// Node the finding is about.
    pub node_id: NodeId,
    /// Display label of the node.
    pub node_label: String,
    /// Category of the finding.
    pub kind: BottleneckKind,
    /// How urgent the finding is.
    pub severity: Severity,
    /// What was observed.
    pub message: String,
    /// Actionable fix, usually a target instance count.
    pub suggestion: String,
    /// Measured value that crossed the threshold.
    pub value: f64,
    /// Threshold that was crossed.
    pub threshold: f64,
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} ({}): {}. {}",
            self.severity, self.node_label, self.kind, self.message, self.suggestion
        )
    }
}

/// Inputs a rule sees for one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'r> {
    /// Diagram node under evaluation.
    pub node: &'r Node,
    /// Final counters of the node.
    pub state: &'r NodeState,
    /// Length of the run in seconds.
    pub duration_seconds: u32,
}

impl NodeContext<'_> {
    /// Average arrivals per second over the run.
    pub fn avg_rps(&self) -> f64 {
        self.state.requests_received as f64 / f64::from(self.duration_seconds.max(1))
    }

    /// Total sustainable requests per second.
    pub fn max_rps(&self) -> f64 {
        self.state.capacity.max_rps()
    }

    /// Instances needed to serve `rps` at the target utilization.
    pub fn recommended_instances(&self, rps: f64) -> u32 {
        let per_instance = self.state.capacity.profile.max_rps_per_instance * TARGET_UTILIZATION;
        if per_instance <= 0.0 {
            return self.state.capacity.instances;
        }
        ((rps / per_instance).ceil() as u32).max(self.state.capacity.instances.saturating_add(1))
    }

    fn finding(
        &self,
        kind: BottleneckKind,
        severity: Severity,
        value: f64,
        threshold: f64,
        message: String,
        suggestion: String,
    ) -> Bottleneck {
        Bottleneck {
            node_id: self.node.id.clone(),
            node_label: self.node.label().to_string(),
            kind,
            severity,
            message,
            suggestion,
            value,
            threshold,
        }
    }
}

/// Trait for bottleneck detection rules.
pub trait BottleneckRule: Send + Sync {
    /// Evaluates the rule for one node that received traffic.
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<Bottleneck>;

    /// Returns name of this rule.
    fn name(&self) -> &str;
}

/// Average load against capacity.
pub struct CapacityRule;

impl BottleneckRule for CapacityRule {
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<Bottleneck> {
        let avg_rps = ctx.avg_rps();
        let max_rps = ctx.max_rps();
        let ratio = avg_rps / max_rps;

        let (severity, threshold) = if ratio > 1.0 {
            (Severity::Critical, 1.0)
        } else if ratio >= CAPACITY_WARNING_RATIO {
            (Severity::Warning, CAPACITY_WARNING_RATIO)
        } else {
            return None;
        };

        Some(ctx.finding(
            BottleneckKind::CpuOverload,
            severity,
            ratio,
            threshold,
            format!(
                "Average load {avg_rps:.0} rps is {:.0}% of capacity ({max_rps:.0} rps)",
                ratio * 100.0
            ),
            format!(
                "Scale to {} instances",
                ctx.recommended_instances(avg_rps)
            ),
        ))
    }

    fn name(&self) -> &str {
        "Capacity"
    }
}

/// Peak one-second load against capacity.
pub struct PeakLoadRule;

impl BottleneckRule for PeakLoadRule {
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<Bottleneck> {
        let peak = ctx.state.peak_rps as f64;
        let max_rps = ctx.max_rps();

        let (severity, threshold) = if peak > max_rps {
            (Severity::Critical, max_rps)
        } else if peak > CAPACITY_WARNING_RATIO * max_rps {
            (Severity::Warning, CAPACITY_WARNING_RATIO * max_rps)
        } else {
            return None;
        };

        Some(ctx.finding(
            BottleneckKind::QueueBuildup,
            severity,
            peak,
            threshold,
            format!("Peak load {peak:.0} rps against capacity {max_rps:.0} rps"),
            format!(
                "Provision {} instances to absorb peaks",
                ctx.recommended_instances(peak)
            ),
        ))
    }

    fn name(&self) -> &str {
        "PeakLoad"
    }
}

/// Average latency against the expected base latency.
pub struct LatencyRule;

impl BottleneckRule for LatencyRule {
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<Bottleneck> {
        let base = ctx.state.capacity.profile.latency.base_ms;
        let avg = ctx.state.average_latency_ms();
        if base <= 0.0 || ctx.state.requests_processed == 0 {
            return None;
        }
        let ratio = avg / base;

        let (severity, threshold) = if ratio > 5.0 {
            (Severity::Critical, 5.0)
        } else if ratio > 3.0 {
            (Severity::Warning, 3.0)
        } else {
            return None;
        };

        Some(ctx.finding(
            BottleneckKind::HighLatency,
            severity,
            ratio,
            threshold,
            format!("Average latency {avg:.1}ms is {ratio:.1}x the expected {base:.1}ms"),
            "Reduce per-request work, add indexes or a cache, or scale out".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "Latency"
    }
}

/// Fraction of requests dropped by overload.
pub struct ErrorRateRule;

impl BottleneckRule for ErrorRateRule {
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<Bottleneck> {
        let rate = ctx.state.error_rate();

        let (severity, threshold) = if rate > 0.05 {
            (Severity::Critical, 0.05)
        } else if rate > 0.01 {
            (Severity::Warning, 0.01)
        } else {
            return None;
        };

        Some(ctx.finding(
            BottleneckKind::QueueBuildup,
            severity,
            rate,
            threshold,
            format!(
                "{:.1}% of requests failed ({} of {})",
                rate * 100.0,
                ctx.state.errors,
                ctx.state.requests_received
            ),
            format!(
                "Scale to {} instances to stop dropping requests",
                ctx.recommended_instances(ctx.state.peak_rps as f64)
            ),
        ))
    }

    fn name(&self) -> &str {
        "ErrorRate"
    }
}

/// Runs a set of rules over every node of a finished run.
pub struct BottleneckDetector {
    rules: Vec<Box<dyn BottleneckRule>>,
}

impl Default for BottleneckDetector {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(CapacityRule),
                Box::new(PeakLoadRule),
                Box::new(LatencyRule),
                Box::new(ErrorRateRule),
            ],
        }
    }
}

impl BottleneckDetector {
    /// Creates a detector with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: Box<dyn BottleneckRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluates every rule for every node that received traffic.
    ///
    /// Findings are ordered critical first, then by diagram order.
    pub fn detect(
        &self,
        graph: &TopologyGraph<'_>,
        state: &RunState,
        duration_seconds: u32,
    ) -> Vec<Bottleneck> {
        let mut findings: Vec<Bottleneck> = graph
            .nodes()
            .filter(|&(ix, _)| state.nodes[ix].requests_received > 0)
            .flat_map(|(ix, node)| {
                let ctx = NodeContext {
                    node,
                    state: &state.nodes[ix],
                    duration_seconds,
                };
                self.rules
                    .iter()
                    .filter_map(move |rule| rule.evaluate(&ctx))
            })
            .collect();

        findings.sort_by_key(|b| Reverse(b.severity));

        for finding in findings.iter().filter(|b| b.severity == Severity::Critical) {
            warn!(node = %finding.node_id, kind = %finding.kind, "{}", finding.message);
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::{ComputeData, NodeKind, NodeType, Scaling};

    use super::*;
    use crate::behavior::{NodeCapacity, profile_for};

    fn api_node() -> Node {
        Node::new(
            "api",
            NodeKind::ApiServer(archsim_core::ApiServerData {
                compute: ComputeData {
                    label: Some("API".to_string()),
                    scaling: Scaling::Single,
                },
                endpoints: Vec::new(),
            }),
        )
    }

    fn api_state(received: u64, errors: u64, peak: u64, latency_ms: f64) -> NodeState {
        let mut state = NodeState::new(NodeCapacity {
            profile: profile_for(NodeType::ApiServer).unwrap(),
            instances: 1,
        });
        state.requests_received = received;
        state.errors = errors;
        state.peak_rps = peak;
        for _ in 0..(received - errors) {
            state.record_processed(latency_ms);
        }
        state
    }

    #[test]
    fn test_recommended_instances_saturates_at_max_count() {
        let node = api_node();
        let state = NodeState::new(NodeCapacity {
            profile: profile_for(NodeType::ApiServer).unwrap(),
            instances: u32::MAX,
        });
        let ctx = NodeContext {
            node: &node,
            state: &state,
            duration_seconds: 10,
        };
        assert_eq!(ctx.recommended_instances(100.0), u32::MAX);

        let state = NodeState::new(NodeCapacity {
            profile: profile_for(NodeType::ApiServer).unwrap(),
            instances: 2,
        });
        let ctx = NodeContext {
            node: &node,
            state: &state,
            duration_seconds: 10,
        };
        // ceil(100 / 700) = 1, raised to one more than provisioned.
        assert_eq!(ctx.recommended_instances(100.0), 3);
        // ceil(3500 / 700) = 5.
        assert_eq!(ctx.recommended_instances(3500.0), 5);
    }

    fn evaluate(rule: &dyn BottleneckRule, state: &NodeState) -> Option<Bottleneck> {
        let node = api_node();
        rule.evaluate(&NodeContext {
            node: &node,
            state,
            duration_seconds: 10,
        })
    }

    #[test]
    fn test_capacity_thresholds() {
        // API capacity is 1000 rps; 10 seconds of traffic.
        assert!(evaluate(&CapacityRule, &api_state(7_000, 0, 700, 20.0)).is_none());

        let warning = evaluate(&CapacityRule, &api_state(9_000, 0, 900, 20.0)).unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.kind, BottleneckKind::CpuOverload);

        let critical = evaluate(&CapacityRule, &api_state(12_000, 0, 1200, 20.0)).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(critical.suggestion, "Scale to 2 instances");
    }

    #[test]
    fn test_peak_load_thresholds() {
        assert!(evaluate(&PeakLoadRule, &api_state(100, 0, 800, 20.0)).is_none());

        let warning = evaluate(&PeakLoadRule, &api_state(100, 0, 850, 20.0)).unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.kind, BottleneckKind::QueueBuildup);

        let critical = evaluate(&PeakLoadRule, &api_state(100, 0, 1500, 20.0)).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
    }

    #[test]
    fn test_latency_thresholds() {
        // API base latency is 20ms.
        assert!(evaluate(&LatencyRule, &api_state(10, 0, 1, 60.0)).is_none());
        assert_eq!(
            evaluate(&LatencyRule, &api_state(10, 0, 1, 70.0)).unwrap().severity,
            Severity::Warning
        );
        let critical = evaluate(&LatencyRule, &api_state(10, 0, 1, 120.0)).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(critical.kind, BottleneckKind::HighLatency);
    }

    #[test]
    fn test_error_rate_reuses_queue_buildup() {
        assert!(evaluate(&ErrorRateRule, &api_state(1000, 10, 1, 20.0)).is_none());
        assert_eq!(
            evaluate(&ErrorRateRule, &api_state(1000, 20, 1, 20.0)).unwrap().severity,
            Severity::Warning
        );
        let critical = evaluate(&ErrorRateRule, &api_state(1000, 100, 1, 20.0)).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(critical.kind, BottleneckKind::QueueBuildup);
    }

    #[test]
    fn test_rule_names() {
        let detector = BottleneckDetector::default();
        let names: Vec<&str> = detector.rules.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Capacity", "PeakLoad", "Latency", "ErrorRate"]);
        assert!(BottleneckDetector::empty().rules.is_empty());
    }
}
