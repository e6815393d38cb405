//! Static performance profiles per node type.

use archsim_core::{Node, NodeType};
use serde::Serialize;

use crate::rng::SimRng;

/// Memory provisioned per instance, in megabytes.
pub const MEMORY_PER_INSTANCE_MB: f64 = 1024.0;

/// Latency distribution of a component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyModel {
    /// Minimum latency of one request, in milliseconds.
    pub base_ms: f64,
    /// Uniform spread added on top of the base, in milliseconds.
    pub variance_ms: f64,
    /// Expected ratio of P99 latency to base latency.
    pub p99_multiplier: f64,
}

impl LatencyModel {
    /// Draws `base + variance * r` with `r` in [0, 1) from the run's generator.
    pub fn sample(&self, rng: &mut SimRng) -> f64 {
        self.base_ms + self.variance_ms * rng.next_f64()
    }
}

/// Performance profile of one node type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorProfile {
    /// Per-request latency distribution.
    pub latency: LatencyModel,
    /// Sustainable requests per second of a single instance.
    pub max_rps_per_instance: f64,
    /// CPU-seconds equivalent consumed per request.
    pub cpu_cost_per_request: f64,
    /// Memory held per in-flight request, in megabytes.
    pub memory_cost_per_request_mb: f64,
}

const fn profile(
    base_ms: f64,
    variance_ms: f64,
    p99_multiplier: f64,
    max_rps_per_instance: f64,
    cpu_cost_per_request: f64,
    memory_cost_per_request_mb: f64,
) -> BehaviorProfile {
    BehaviorProfile {
        latency: LatencyModel {
            base_ms,
            variance_ms,
            p99_multiplier,
        },
        max_rps_per_instance,
        cpu_cost_per_request,
        memory_cost_per_request_mb,
    }
}

const TRAFFIC_SOURCE: BehaviorProfile = profile(1.0, 1.0, 1.5, 1_000_000.0, 0.0, 0.0);
const LOAD_BALANCER: BehaviorProfile = profile(1.0, 2.0, 3.0, 10_000.0, 0.0001, 0.01);
const CDN: BehaviorProfile = profile(5.0, 10.0, 4.0, 50_000.0, 0.0001, 0.05);
const API_SERVER: BehaviorProfile = profile(20.0, 30.0, 5.0, 1_000.0, 0.01, 2.0);
const DATABASE: BehaviorProfile = profile(5.0, 15.0, 10.0, 500.0, 0.02, 5.0);
const OBJECT_STORE: BehaviorProfile = profile(50.0, 100.0, 4.0, 3_500.0, 0.005, 1.0);
const CACHE: BehaviorProfile = profile(1.0, 1.0, 5.0, 50_000.0, 0.0005, 0.1);
const QUEUE: BehaviorProfile = profile(2.0, 5.0, 5.0, 10_000.0, 0.001, 0.2);

/// Returns the profile of a node type, `None` for annotations.
pub fn profile_for(node_type: NodeType) -> Option<&'static BehaviorProfile> {
    match node_type {
        NodeType::TrafficSource => Some(&TRAFFIC_SOURCE),
        NodeType::LoadBalancer => Some(&LOAD_BALANCER),
        NodeType::Cdn => Some(&CDN),
        NodeType::ApiServer => Some(&API_SERVER),
        NodeType::Database => Some(&DATABASE),
        NodeType::ObjectStore => Some(&OBJECT_STORE),
        NodeType::Cache => Some(&CACHE),
        NodeType::Queue => Some(&QUEUE),
        NodeType::Annotation => None,
    }
}

/// Resolved capacity of one node for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCapacity {
    /// Static profile of the node's type.
    pub profile: &'static BehaviorProfile,
    /// Resolved instance count, never zero.
    pub instances: u32,
}

impl NodeCapacity {
    /// Resolves profile and instance count, `None` for annotations.
    pub fn resolve(node: &Node) -> Option<Self> {
        profile_for(node.node_type()).map(|profile| Self {
            profile,
            instances: node.scaling().instances(),
        })
    }

    /// Total sustainable requests per second across all instances.
    pub fn max_rps(&self) -> f64 {
        f64::from(self.instances) * self.profile.max_rps_per_instance
    }

    /// Declared memory across all instances, in megabytes.
    pub fn memory_capacity_mb(&self) -> f64 {
        f64::from(self.instances) * MEMORY_PER_INSTANCE_MB
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::{ComputeData, NodeKind, Scaling};

    use super::*;

    #[test]
    fn test_every_simulated_type_has_a_profile() {
        for node_type in [
            NodeType::TrafficSource,
            NodeType::LoadBalancer,
            NodeType::Cdn,
            NodeType::ApiServer,
            NodeType::Database,
            NodeType::ObjectStore,
            NodeType::Cache,
            NodeType::Queue,
        ] {
            let profile = profile_for(node_type).unwrap();
            assert!(profile.latency.base_ms > 0.0);
            assert!(profile.max_rps_per_instance > 0.0);
        }
        assert!(profile_for(NodeType::Annotation).is_none());
    }

    #[test]
    fn test_latency_sample_within_bounds() {
        let model = profile_for(NodeType::ApiServer).unwrap().latency;
        let mut rng = SimRng::from_seed(3);
        for _ in 0..1000 {
            let latency = model.sample(&mut rng);
            assert!(latency >= model.base_ms);
            assert!(latency < model.base_ms + model.variance_ms);
        }
    }

    #[test]
    fn test_capacity_scales_with_instances() {
        let node = Node::new(
            "api",
            NodeKind::Cdn(ComputeData {
                label: None,
                scaling: Scaling::Fixed { instances: 3 },
            }),
        );
        let capacity = NodeCapacity::resolve(&node).unwrap();

        assert_eq!(capacity.instances, 3);
        assert_eq!(capacity.max_rps(), 150_000.0);
        assert_eq!(capacity.memory_capacity_mb(), 3072.0);
    }
}
