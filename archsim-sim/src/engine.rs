//! Run loop and result aggregation.

use std::collections::BTreeMap;

use archsim_core::{ConfigError, NodeType, RunConfig, TableId, Topology};
use thiserror::Error;
use tracing::{debug, info};

use crate::bottleneck::BottleneckDetector;
use crate::cache::CacheEstimator;
use crate::metrics::{
    CacheAnalysisRecord, EdgeMetrics, EntryPointMetrics, NodeMetrics, NodeSnapshot,
    QueryAnalysisRecord, SimulationResult, TimelineSnapshot, cpu_percent, mean, memory_percent,
    p99,
};
use crate::path::{PathContext, simulate_request};
use crate::query::{QueryAnalysis, QueryAnalyzer};
use crate::rng::SimRng;
use crate::state::RunState;
use crate::topology::{NodeIx, TopologyGraph};

/// Errors that can prevent a simulation from starting.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Run configuration failed validation
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// A configured simulation over a borrowed topology.
///
/// Each call to [`Simulation::run`] owns fresh state and a fresh random
/// generator, so runs never observe each other.
pub struct Simulation<'t> {
    topology: &'t Topology,
    config: RunConfig,
    detector: BottleneckDetector,
}

impl<'t> Simulation<'t> {
    /// Creates a simulation with the default bottleneck rules.
    pub fn new(topology: &'t Topology, config: RunConfig) -> Self {
        Self {
            topology,
            config,
            detector: BottleneckDetector::default(),
        }
    }

    /// Replaces the bottleneck detector.
    pub fn with_detector(mut self, detector: BottleneckDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the simulation to completion.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidConfig` - If the configuration fails validation
    pub fn run(&self) -> Result<SimulationResult, SimulationError> {
        self.config.validate()?;

        let graph = TopologyGraph::build(self.topology);
        let mut rng = SimRng::for_seed(self.config.seed);
        let (query_analyses, query_costs) = precompute_queries(&graph);
        let (cache_analyses, cache_hit_rates) =
            precompute_caches(&graph, self.config.requests_per_second);

        let ctx = PathContext {
            graph: &graph,
            query_costs: &query_costs,
            cache_hit_rates: &cache_hit_rates,
            options: self.config.options,
        };
        let mut state = RunState::new(&graph);

        let entry_count = graph.entry_points().len();
        let requests_per_entry =
            (self.config.requests_per_second / entry_count.max(1) as f64).ceil() as u64;

        info!(
            seed = ?self.config.seed,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            entry_points = entry_count,
            duration_seconds = self.config.duration_seconds,
            requests_per_entry,
            "Starting simulation run"
        );

        let mut timeline = Vec::with_capacity(self.config.duration_seconds as usize);
        for second in 0..self.config.duration_seconds {
            state.start_second();
            let issued_before = state.total_requests();

            for slot in 0..state.entry_points.len() {
                let entry = state.entry_points[slot].node;
                for _ in 0..requests_per_entry {
                    let outcome = simulate_request(&ctx, &mut state, &mut rng, entry);
                    state.entry_points[slot].record(outcome.total_latency_ms, outcome.success);
                }
            }

            state.finish_second();
            let issued = state.total_requests() - issued_before;
            debug!(second, requests = issued, "Simulated second");
            timeline.push(snapshot(second, issued, &graph, &state));
        }

        let bottlenecks = self
            .detector
            .detect(&graph, &state, self.config.duration_seconds);
        let result = SimulationResult {
            config: self.config.clone(),
            total_requests: state.total_requests(),
            nodes: node_metrics(&graph, &state, self.config.duration_seconds),
            edges: edge_metrics(&graph, &state),
            entry_points: entry_point_metrics(&graph, &state),
            bottlenecks,
            timeline,
            query_analyses,
            cache_analyses,
        };

        info!(
            total_requests = result.total_requests,
            bottlenecks = result.bottlenecks.len(),
            "Simulation run complete"
        );
        Ok(result)
    }
}

/// Validates `config` and runs it against `topology`.
///
/// # Errors
///
/// - `SimulationError::InvalidConfig` - If the configuration fails validation
pub fn simulate(
    topology: &Topology,
    config: RunConfig,
) -> Result<SimulationResult, SimulationError> {
    Simulation::new(topology, config).run()
}

/// Analyzes every linked query once per (database node, table).
///
/// When several queries target the same table the last one analyzed wins.
/// Returns the records plus the summed cost per node index.
fn precompute_queries(graph: &TopologyGraph<'_>) -> (Vec<QueryAnalysisRecord>, Vec<f64>) {
    let mut by_table: BTreeMap<(NodeIx, TableId), (String, QueryAnalysis)> = BTreeMap::new();

    for (_, node) in graph.nodes() {
        let queries = node.endpoints().iter().flat_map(|e| &e.linked_queries);
        for query in queries {
            let Some(db_ix) = graph.node_ix(&query.node_id) else {
                debug!(node = %query.node_id, "Linked query targets unknown node");
                continue;
            };
            let db = graph.node(db_ix);
            if db.node_type() != NodeType::Database {
                debug!(node = %query.node_id, "Linked query targets non-database node");
                continue;
            }
            let Some(table) = db.tables().iter().find(|t| t.id == query.table_id) else {
                debug!(
                    node = %db.id,
                    table = %query.table_id,
                    "Linked query targets unknown table"
                );
                continue;
            };
            let Some(analysis) = QueryAnalyzer::analyze(query, table) else {
                debug!(node = %db.id, table = %table.id, "Linked query names unknown column");
                continue;
            };
            by_table.insert((db_ix, table.id.clone()), (table.name.clone(), analysis));
        }
    }

    let mut costs = vec![0.0; graph.node_count()];
    let records: Vec<QueryAnalysisRecord> = by_table
        .into_iter()
        .map(|((db_ix, table_id), (table_name, analysis))| {
            costs[db_ix] += analysis.estimated_cost_ms;
            QueryAnalysisRecord {
                node_id: graph.node(db_ix).id.clone(),
                table_id,
                table_name,
                analysis,
            }
        })
        .collect();

    (records, costs)
}

/// Estimates every cache key of every cache node against the configured rate.
///
/// Returns the records plus each cache node's mean hit rate.
fn precompute_caches(
    graph: &TopologyGraph<'_>,
    ambient_rps: f64,
) -> (Vec<CacheAnalysisRecord>, Vec<Option<f64>>) {
    let mut records = Vec::new();
    let mut hit_rates = vec![None; graph.node_count()];

    for (ix, node) in graph.nodes() {
        let keys = node.cache_keys();
        if keys.is_empty() {
            continue;
        }
        let start = records.len();
        records.extend(keys.iter().map(|key| CacheAnalysisRecord {
            node_id: node.id.clone(),
            key_id: key.id.clone(),
            pattern: key.pattern.clone(),
            analysis: CacheEstimator::analyze(key, ambient_rps),
        }));
        let rates: Vec<f64> = records[start..]
            .iter()
            .map(|r| r.analysis.estimated_hit_rate)
            .collect();
        hit_rates[ix] = Some(mean(&rates));
    }

    (records, hit_rates)
}

fn snapshot(
    second: u32,
    requests: u64,
    graph: &TopologyGraph<'_>,
    state: &RunState,
) -> TimelineSnapshot {
    let nodes = graph
        .nodes()
        .map(|(ix, node)| {
            let node_state = &state.nodes[ix];
            let rps = node_state.current_rps as f64;
            NodeSnapshot {
                node_id: node.id.clone(),
                rps: node_state.current_rps,
                avg_latency_ms: node_state.average_latency_ms(),
                cpu_percent: cpu_percent(rps, node_state),
                memory_percent: memory_percent(rps, node_state),
                error_rate: node_state.error_rate(),
            }
        })
        .collect();

    TimelineSnapshot {
        second,
        requests,
        nodes,
    }
}

fn node_metrics(
    graph: &TopologyGraph<'_>,
    state: &RunState,
    duration_seconds: u32,
) -> Vec<NodeMetrics> {
    graph
        .nodes()
        .map(|(ix, node)| {
            let s = &state.nodes[ix];
            let avg_rps = s.requests_received as f64 / f64::from(duration_seconds.max(1));
            NodeMetrics {
                node_id: node.id.clone(),
                node_type: node.node_type(),
                label: node.label().to_string(),
                instances: s.capacity.instances,
                capacity_rps: s.capacity.max_rps(),
                requests_received: s.requests_received,
                requests_processed: s.requests_processed,
                requests_queued: s.requests_queued(),
                errors: s.errors,
                error_rate: s.error_rate(),
                avg_latency_ms: s.average_latency_ms(),
                p99_latency_ms: p99(&s.latency_samples),
                avg_rps,
                current_rps: s.current_rps,
                peak_rps: s.peak_rps,
                cpu_utilization: cpu_percent(avg_rps, s),
                memory_utilization: memory_percent(avg_rps, s),
            }
        })
        .collect()
}

fn edge_metrics(graph: &TopologyGraph<'_>, state: &RunState) -> Vec<EdgeMetrics> {
    (0..graph.edge_count())
        .map(|ix| {
            let edge = graph.edge(ix);
            let s = &state.edges[ix];
            let avg_latency_ms = if s.request_count == 0 {
                0.0
            } else {
                s.latency_sum_ms / s.request_count as f64
            };
            EdgeMetrics {
                edge_id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
                request_count: s.request_count,
                bytes_transferred: s.bytes_transferred,
                avg_latency_ms,
            }
        })
        .collect()
}

fn entry_point_metrics(graph: &TopologyGraph<'_>, state: &RunState) -> Vec<EntryPointMetrics> {
    state
        .entry_points
        .iter()
        .map(|e| EntryPointMetrics {
            node_id: graph.node(e.node).id.clone(),
            total_requests: e.total_requests,
            successful_requests: e.successful,
            failed_requests: e.failed,
            avg_rtt_ms: mean(&e.rtt_samples),
            p99_rtt_ms: p99(&e.rtt_samples),
            success_rate: e.success_rate(),
        })
        .collect()
}
