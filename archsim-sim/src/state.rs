//! Run-scoped mutable state.
//!
//! One [`RunState`] is created per run and owns every counter the run
//! touches. It is dropped once the result has been assembled.

use crate::behavior::NodeCapacity;
use crate::topology::{NodeIx, TopologyGraph};

/// Bytes accounted per request crossing an edge.
pub const BYTES_PER_REQUEST: u64 = 1024;

/// Counters of one simulated node.
#[derive(Debug, Clone)]
pub struct NodeState {
    /// Capacity the node was provisioned with.
    pub capacity: NodeCapacity,
    /// Arrivals across the run.
    pub requests_received: u64,
    /// Requests completed across the run.
    pub requests_processed: u64,
    /// Requests dropped at this node by overload.
    pub errors: u64,
    /// Latency of every processed request, in milliseconds.
    pub latency_samples: Vec<f64>,
    /// Sum of `latency_samples`.
    pub total_latency_ms: f64,
    /// Arrivals in the current one-second tick.
    pub requests_this_second: u64,
    /// Arrivals in the last completed tick.
    pub current_rps: u64,
    /// Highest `current_rps` seen so far.
    pub peak_rps: u64,
}

impl NodeState {
    /// Creates zeroed counters for a node.
    pub fn new(capacity: NodeCapacity) -> Self {
        Self {
            capacity,
            requests_received: 0,
            requests_processed: 0,
            errors: 0,
            latency_samples: Vec::new(),
            total_latency_ms: 0.0,
            requests_this_second: 0,
            current_rps: 0,
            peak_rps: 0,
        }
    }

    /// Records an arrival.
    pub fn record_arrival(&mut self) {
        self.requests_received += 1;
        self.requests_this_second += 1;
    }

    /// Records a request dropped by overload.
    pub fn record_drop(&mut self) {
        self.errors += 1;
    }

    /// Records a processed request and its latency.
    pub fn record_processed(&mut self, latency_ms: f64) {
        self.requests_processed += 1;
        self.latency_samples.push(latency_ms);
        self.total_latency_ms += latency_ms;
    }

    /// Ratio of this tick's arrivals to total capacity.
    pub fn load_factor(&self) -> f64 {
        let max_rps = self.capacity.max_rps();
        if max_rps <= 0.0 {
            return 0.0;
        }
        self.requests_this_second as f64 / max_rps
    }

    /// Closes the current tick, updating current and peak rates.
    pub fn close_second(&mut self) {
        self.current_rps = self.requests_this_second;
        self.peak_rps = self.peak_rps.max(self.current_rps);
    }

    /// Clears the per-tick arrival counter.
    pub fn reset_second(&mut self) {
        self.requests_this_second = 0;
    }

    /// Average latency of processed requests so far.
    pub fn average_latency_ms(&self) -> f64 {
        if self.requests_processed == 0 {
            return 0.0;
        }
        self.total_latency_ms / self.requests_processed as f64
    }

    /// Fraction of arrivals dropped so far.
    pub fn error_rate(&self) -> f64 {
        if self.requests_received == 0 {
            return 0.0;
        }
        self.errors as f64 / self.requests_received as f64
    }

    /// Arrivals not processed. Never negative.
    pub fn requests_queued(&self) -> u64 {
        self.requests_received.saturating_sub(self.requests_processed)
    }
}

/// Counters of one edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeState {
    /// Requests that crossed the edge.
    pub request_count: u64,
    /// Bytes accounted for those requests.
    pub bytes_transferred: u64,
    /// Sum of the source node latencies, in milliseconds.
    pub latency_sum_ms: f64,
}

impl EdgeState {
    /// Records one request crossing the edge.
    pub fn record(&mut self, latency_ms: f64) {
        self.request_count += 1;
        self.bytes_transferred += BYTES_PER_REQUEST;
        self.latency_sum_ms += latency_ms;
    }
}

/// Round-trip counters of one traffic source.
#[derive(Debug, Clone)]
pub struct EntryPointState {
    /// Index of the traffic-source node.
    pub node: NodeIx,
    /// Requests issued.
    pub total_requests: u64,
    /// Requests that completed.
    pub successful: u64,
    /// Requests dropped along the path.
    pub failed: u64,
    /// Round-trip time of every request, in milliseconds.
    pub rtt_samples: Vec<f64>,
}

impl EntryPointState {
    /// Creates zeroed counters for a traffic source.
    pub fn new(node: NodeIx) -> Self {
        Self {
            node,
            total_requests: 0,
            successful: 0,
            failed: 0,
            rtt_samples: Vec::new(),
        }
    }

    /// Records one round trip.
    pub fn record(&mut self, latency_ms: f64, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.rtt_samples.push(latency_ms);
    }

    /// Fraction of successful round trips, 1 when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful as f64 / self.total_requests as f64
    }
}

/// Every mutable record of one run.
#[derive(Debug, Clone)]
pub struct RunState {
    /// State per node index.
    pub nodes: Vec<NodeState>,
    /// State per edge index.
    pub edges: Vec<EdgeState>,
    /// State per traffic source, in entry-point order.
    pub entry_points: Vec<EntryPointState>,
    /// Rotation cursor per node, used by round-robin load balancing.
    pub balancer_cursors: Vec<usize>,
}

impl RunState {
    /// Allocates zeroed state for every node, edge and traffic source.
    pub fn new(graph: &TopologyGraph<'_>) -> Self {
        Self {
            nodes: (0..graph.node_count())
                .map(|ix| NodeState::new(graph.capacity(ix)))
                .collect(),
            edges: vec![EdgeState::default(); graph.edge_count()],
            entry_points: graph
                .entry_points()
                .iter()
                .map(|&ix| EntryPointState::new(ix))
                .collect(),
            balancer_cursors: vec![0; graph.node_count()],
        }
    }

    /// Clears every node's per-tick counter.
    pub fn start_second(&mut self) {
        self.nodes.iter_mut().for_each(NodeState::reset_second);
    }

    /// Closes the tick on every node.
    pub fn finish_second(&mut self) {
        self.nodes.iter_mut().for_each(NodeState::close_second);
    }

    /// Total requests issued by all traffic sources.
    pub fn total_requests(&self) -> u64 {
        self.entry_points.iter().map(|e| e.total_requests).sum()
    }
}
