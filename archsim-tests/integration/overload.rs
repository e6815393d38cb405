//! Degradation and bottleneck reporting as load grows.

use archsim_core::tracing_setup::init_test_tracing;
use archsim_core::{RunConfig, Scaling, Topology};
use archsim_sim::{
    BottleneckDetector, BottleneckKind, BottleneckRule, CapacityRule, NodeContext, Severity,
    Simulation, SimulationResult,
};

fn single_api() -> Topology {
    Topology::builder()
        .traffic_source("clients")
        .api_server("api", Scaling::Single, Vec::new())
        .connect("clients", "api")
        .build()
}

fn run(rps: f64) -> SimulationResult {
    Simulation::new(&single_api(), RunConfig::new(5, rps).with_seed(31))
        .run()
        .expect("valid configuration")
}

fn worst_capacity_severity(result: &SimulationResult) -> Option<Severity> {
    result
        .bottlenecks
        .iter()
        .filter(|b| b.node_id.as_str() == "api" && b.kind == BottleneckKind::CpuOverload)
        .map(|b| b.severity)
        .max()
}

#[test]
fn test_severity_grows_with_load() {
    init_test_tracing();

    let light = run(50.0);
    let busy = run(850.0);
    let saturated = run(2000.0);

    assert_eq!(worst_capacity_severity(&light), None);
    assert_eq!(worst_capacity_severity(&busy), Some(Severity::Warning));
    assert_eq!(worst_capacity_severity(&saturated), Some(Severity::Critical));

    let api = |r: &SimulationResult| r.node("api").map(|n| n.avg_latency_ms).unwrap_or(0.0);
    assert!(api(&light) < api(&saturated));
}

#[test]
fn test_drops_only_past_drop_threshold() {
    init_test_tracing();

    // 1500 arrivals against 1000 rps never exceeds a load factor of 1.5.
    let at_threshold = run(1500.0);
    assert_eq!(at_threshold.node("api").map(|n| n.errors), Some(0));
    assert_eq!(at_threshold.entry_point("clients").map(|e| e.failed_requests), Some(0));

    let beyond = run(2000.0);
    let api = beyond.node("api").unwrap();
    assert!(api.errors > 0);
    assert!(api.error_rate > 0.05);
    assert!(
        beyond
            .bottlenecks
            .iter()
            .any(|b| b.kind == BottleneckKind::QueueBuildup && b.severity == Severity::Critical)
    );
}

#[test]
fn test_suggestion_recommends_more_instances() {
    let saturated = run(2000.0);
    let finding = saturated
        .bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::CpuOverload)
        .unwrap();
    // ceil(2000 / (1000 * 0.7)) = 3.
    assert!(finding.suggestion.contains("3 instances"), "{}", finding.suggestion);
    assert_eq!(finding.threshold, 1.0);
    assert!(finding.value > 1.0);
}

struct AlwaysFlag;

impl BottleneckRule for AlwaysFlag {
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Option<archsim_sim::Bottleneck> {
        Some(archsim_sim::Bottleneck {
            node_id: ctx.node.id.clone(),
            node_label: ctx.node.label().to_string(),
            kind: BottleneckKind::HighLatency,
            severity: Severity::Warning,
            message: "flagged".to_string(),
            suggestion: "none".to_string(),
            value: 0.0,
            threshold: 0.0,
        })
    }

    fn name(&self) -> &str {
        "AlwaysFlag"
    }
}

#[test]
fn test_custom_detector_rules() {
    let topology = single_api();
    let config = RunConfig::new(2, 10.0).with_seed(3);

    let result = Simulation::new(&topology, config.clone())
        .with_detector(BottleneckDetector::empty().with_rule(Box::new(AlwaysFlag)))
        .run()
        .unwrap();
    // Both the traffic source and the api received traffic.
    assert_eq!(result.bottlenecks.len(), 2);
    assert!(result.bottlenecks.iter().all(|b| b.message == "flagged"));

    let result = Simulation::new(&topology, config)
        .with_detector(BottleneckDetector::empty().with_rule(Box::new(CapacityRule)))
        .run()
        .unwrap();
    assert!(result.bottlenecks.is_empty());
}
