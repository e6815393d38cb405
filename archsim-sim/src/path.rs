//! Simulation of a single request travelling through the topology.
//!
//! A request starts at a traffic source and performs a breadth-first walk
//! over outgoing edges, visiting each node at most once. Latencies of every
//! visited node add up; parallel downstream calls are not overlapped.

use std::collections::VecDeque;

use archsim_core::{LoadBalancing, NodeType, SimulationOptions};

use crate::rng::SimRng;
use crate::state::RunState;
use crate::topology::{EdgeIx, NodeIx, TopologyGraph};

/// Load factor above which requests may be dropped.
const DROP_THRESHOLD: f64 = 1.5;

/// Load factor above which latency grows steeply.
const OVERLOAD_THRESHOLD: f64 = 1.0;

/// Load factor above which latency starts to degrade.
const SATURATION_THRESHOLD: f64 = 0.8;

/// Per-run inputs shared by every request of the run.
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'r, 'a> {
    /// Graph the request walks.
    pub graph: &'r TopologyGraph<'a>,
    /// Precomputed query cost added at each node, in milliseconds.
    pub query_costs: &'r [f64],
    /// Precomputed hit rate of each cache node.
    pub cache_hit_rates: &'r [Option<f64>],
    /// Behavior switches of the run.
    pub options: SimulationOptions,
}

/// Outcome of one simulated request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOutcome {
    /// Sum of the latencies of every node that processed the request.
    pub total_latency_ms: f64,
    /// False only when the request was dropped by an overloaded node.
    pub success: bool,
}

/// Applies the overload penalty to a latency drawn at `load_factor`.
pub fn apply_load_penalty(latency_ms: f64, load_factor: f64) -> f64 {
    if load_factor > OVERLOAD_THRESHOLD {
        latency_ms * (1.0 + (load_factor - OVERLOAD_THRESHOLD) * 10.0)
    } else if load_factor > SATURATION_THRESHOLD {
        latency_ms * (1.0 + ((load_factor - SATURATION_THRESHOLD) / 0.2) * 0.5)
    } else {
        latency_ms
    }
}

/// Drives one request from `entry` and updates run state along the way.
pub fn simulate_request(
    ctx: &PathContext<'_, '_>,
    state: &mut RunState,
    rng: &mut SimRng,
    entry: NodeIx,
) -> PathOutcome {
    let graph = ctx.graph;
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([entry]);
    visited[entry] = true;
    let mut total_latency_ms = 0.0;

    while let Some(ix) = queue.pop_front() {
        let node = &mut state.nodes[ix];
        node.record_arrival();

        let latency = node.capacity.profile.latency.sample(rng) + ctx.query_costs[ix];
        let load_factor = node.load_factor();

        if load_factor > DROP_THRESHOLD && rng.random_bool(load_factor - DROP_THRESHOLD) {
            node.record_drop();
            return PathOutcome {
                total_latency_ms,
                success: false,
            };
        }

        let latency = apply_load_penalty(latency, load_factor);
        node.record_processed(latency);
        total_latency_ms += latency;

        if cache_hit(ctx, rng, ix) {
            continue;
        }

        for edge in next_edges(ctx, state, ix, &visited) {
            let Some((_, target)) = graph.edge_endpoints(edge) else {
                continue;
            };
            if visited[target] {
                continue;
            }
            visited[target] = true;
            state.edges[edge].record(latency);
            queue.push_back(target);
        }
    }

    PathOutcome {
        total_latency_ms,
        success: true,
    }
}

/// Draws a hit at a cache node when short-circuiting is enabled.
fn cache_hit(ctx: &PathContext<'_, '_>, rng: &mut SimRng, ix: NodeIx) -> bool {
    if !ctx.options.cache_short_circuit {
        return false;
    }
    match ctx.cache_hit_rates[ix] {
        Some(rate) => rng.random_bool(rate),
        None => false,
    }
}

/// Outgoing edges to follow from `ix`.
///
/// Load balancers forward to a single unvisited target; every other node
/// calls all of its unvisited downstreams.
fn next_edges(
    ctx: &PathContext<'_, '_>,
    state: &mut RunState,
    ix: NodeIx,
    visited: &[bool],
) -> Vec<EdgeIx> {
    let graph = ctx.graph;
    let unvisited: Vec<EdgeIx> = graph
        .outgoing(ix)
        .iter()
        .copied()
        .filter(|&edge| {
            graph
                .edge_endpoints(edge)
                .is_some_and(|(_, target)| !visited[target])
        })
        .collect();

    if graph.node(ix).node_type() != NodeType::LoadBalancer || unvisited.is_empty() {
        return unvisited;
    }

    match ctx.options.load_balancing {
        LoadBalancing::FirstEdge => vec![unvisited[0]],
        LoadBalancing::RoundRobin => {
            let cursor = &mut state.balancer_cursors[ix];
            let chosen = unvisited[*cursor % unvisited.len()];
            *cursor = cursor.wrapping_add(1);
            vec![chosen]
        }
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::{Scaling, Topology};

    use super::*;

    fn run_requests(
        topology: &Topology,
        options: SimulationOptions,
        requests: usize,
    ) -> (RunState, Vec<PathOutcome>) {
        let graph = TopologyGraph::build(topology);
        let query_costs = vec![0.0; graph.node_count()];
        let cache_hit_rates = vec![None; graph.node_count()];
        let ctx = PathContext {
            graph: &graph,
            query_costs: &query_costs,
            cache_hit_rates: &cache_hit_rates,
            options,
        };
        let mut state = RunState::new(&graph);
        let mut rng = SimRng::from_seed(1);
        let entry = graph.entry_points()[0];
        let outcomes = (0..requests)
            .map(|_| simulate_request(&ctx, &mut state, &mut rng, entry))
            .collect();
        (state, outcomes)
    }

    #[test]
    fn test_load_penalty_bands() {
        assert_eq!(apply_load_penalty(10.0, 0.5), 10.0);
        assert_eq!(apply_load_penalty(10.0, 0.8), 10.0);
        assert!((apply_load_penalty(10.0, 0.9) - 12.5).abs() < 1e-9);
        assert!((apply_load_penalty(10.0, 1.0) - 15.0).abs() < 1e-9);
        assert!((apply_load_penalty(10.0, 1.2) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_chain_visits_every_node() {
        let topology = Topology::builder()
            .traffic_source("users")
            .api_server("api", Scaling::Single, Vec::new())
            .database("db", Scaling::Single, Vec::new())
            .connect("users", "api")
            .connect("api", "db")
            .build();

        let (state, outcomes) = run_requests(&topology, SimulationOptions::default(), 10);

        assert!(outcomes.iter().all(|o| o.success && o.total_latency_ms > 0.0));
        for node in &state.nodes {
            assert_eq!(node.requests_received, 10);
            assert_eq!(node.requests_processed, 10);
        }
        assert_eq!(state.edges[0].request_count, 10);
        assert_eq!(state.edges[1].bytes_transferred, 10 * 1024);
    }

    #[test]
    fn test_cycles_and_diamonds_visit_once() {
        let topology = Topology::builder()
            .traffic_source("users")
            .api_server("a", Scaling::Single, Vec::new())
            .queue("b", Scaling::Single)
            .queue("c", Scaling::Single)
            .database("d", Scaling::Single, Vec::new())
            .connect("users", "a")
            .connect("a", "b")
            .connect("a", "c")
            .connect("b", "d")
            .connect("c", "d")
            .connect("d", "a")
            .build();

        let (state, _) = run_requests(&topology, SimulationOptions::default(), 1);

        for node in &state.nodes {
            assert_eq!(node.requests_received, 1);
        }
        // c -> d and d -> a lose to earlier discoveries.
        assert_eq!(state.edges[4].request_count, 0);
        assert_eq!(state.edges[5].request_count, 0);
    }

    #[test]
    fn test_load_balancer_always_picks_first_edge() {
        let topology = Topology::builder()
            .traffic_source("users")
            .load_balancer("lb", Scaling::Single)
            .api_server("api-1", Scaling::Single, Vec::new())
            .api_server("api-2", Scaling::Single, Vec::new())
            .connect("users", "lb")
            .connect("lb", "api-1")
            .connect("lb", "api-2")
            .build();

        let (state, _) = run_requests(&topology, SimulationOptions::default(), 20);

        assert_eq!(state.nodes[2].requests_received, 20);
        assert_eq!(state.nodes[3].requests_received, 0);
    }

    #[test]
    fn test_round_robin_rotates_targets() {
        let topology = Topology::builder()
            .traffic_source("users")
            .load_balancer("lb", Scaling::Single)
            .api_server("api-1", Scaling::Single, Vec::new())
            .api_server("api-2", Scaling::Single, Vec::new())
            .connect("users", "lb")
            .connect("lb", "api-1")
            .connect("lb", "api-2")
            .build();
        let options = SimulationOptions {
            load_balancing: LoadBalancing::RoundRobin,
            ..Default::default()
        };

        let (state, _) = run_requests(&topology, options, 20);

        assert_eq!(state.nodes[2].requests_received, 10);
        assert_eq!(state.nodes[3].requests_received, 10);
    }

    #[test]
    fn test_overload_drops_stop_traversal() {
        // One single-instance database takes 500 rps; 2000 arrivals in one
        // tick push the load factor far past the drop threshold.
        let topology = Topology::builder()
            .traffic_source("users")
            .database("db", Scaling::Single, Vec::new())
            .queue("q", Scaling::Single)
            .connect("users", "db")
            .connect("db", "q")
            .build();

        let (state, outcomes) = run_requests(&topology, SimulationOptions::default(), 2000);

        let failures = outcomes.iter().filter(|o| !o.success).count() as u64;
        let db = &state.nodes[1];
        assert!(failures > 0);
        assert_eq!(db.errors, failures);
        assert_eq!(db.requests_processed + db.errors, db.requests_received);
        assert_eq!(state.nodes[2].requests_received, db.requests_processed);
    }
}
