//! Archsim Simulation Engine - Load and cost estimation for system diagrams.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! This crate headlessly estimates how a sketched architecture behaves under
//! load: per-component latency, capacity utilization, error rates, detected
//! bottlenecks and database-query efficiency.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same seed always produces identical results
//! - **Tick-Based Simulation**: Whole-second ticks with per-tick load factors
//! - **Overload Modeling**: Latency degradation and probabilistic drops
//! - **Query Costing**: Positional B-tree index matching and scan costs
//! - **Cache Estimation**: Hit rates from key cardinality and TTL
//! - **Bottleneck Detection**: Pluggable post-run rules
//!
//! # Example
//!
//! ```rust
//! use archsim_core::{RunConfig, Scaling, Topology};
//! use archsim_sim::Simulation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let topology = Topology::builder()
//!     .traffic_source("users")
//!     .api_server("api", Scaling::Fixed { instances: 2 }, Vec::new())
//!     .database("db", Scaling::Single, Vec::new())
//!     .connect("users", "api")
//!     .connect("api", "db")
//!     .build();
//!
//! let result = Simulation::new(&topology, RunConfig::new(10, 100.0).with_seed(1)).run()?;
//! assert_eq!(result.total_requests, 1000);
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Topology Graph**: Dense adjacency over the simulated nodes
//! - **Behavior Registry**: Static latency and capacity profile per node type
//! - **Query Analyzer**: Scan strategy and cost per linked query
//! - **Cache Estimator**: Hit rate and pass-through rate per key
//! - **Request Path**: Breadth-first walk of one request with overload penalties
//! - **Run Loop**: One-second ticks, timeline snapshots and final metrics
//! - **Bottleneck Detector**: Capacity, peak, latency and error-rate rules

pub mod behavior;
pub mod bottleneck;
pub mod cache;
pub mod engine;
pub mod metrics;
pub mod path;
pub mod query;
pub mod rng;
pub mod state;
pub mod topology;

pub use behavior::{BehaviorProfile, LatencyModel, NodeCapacity, profile_for};
pub use bottleneck::{
    Bottleneck, BottleneckDetector, BottleneckKind, BottleneckRule, CapacityRule, ErrorRateRule,
    LatencyRule, NodeContext, PeakLoadRule, Severity,
};
pub use cache::{CacheAnalysis, CacheEstimator};
pub use engine::{Simulation, SimulationError, simulate};
pub use metrics::{
    CacheAnalysisRecord, EdgeMetrics, EntryPointMetrics, NodeMetrics, NodeSnapshot,
    QueryAnalysisRecord, SimulationResult, TimelineSnapshot,
};
pub use path::{PathContext, PathOutcome, simulate_request};
pub use query::{
    IndexCoverage, QueryAnalysis, QueryAnalyzer, QueryWarning, QueryWarningKind, ScanType,
};
pub use rng::SimRng;
pub use state::{EdgeState, EntryPointState, NodeState, RunState};
pub use topology::{EdgeIx, NodeIx, TopologyGraph};
