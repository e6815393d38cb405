//! Archsim Core - Topology model and run configuration
//!
//! This crate provides the data model consumed by the simulation engine:
//! typed diagram nodes and edges, database schemas, cache key patterns,
//! the run configuration, and tracing setup shared by all archsim crates.
//!
//! Nothing in this crate performs I/O. Topologies are built programmatically
//! through [`Topology::builder`] or deserialized with `serde` by the caller.

pub mod config;
pub mod ids;
pub mod model;
pub mod tracing_setup;

pub use config::{ConfigError, LoadBalancing, RunConfig, SimulationOptions};
pub use ids::{ColumnId, EdgeId, EndpointId, IndexId, KeyId, NodeId, TableId};
pub use model::{
    AnnotationData, ApiServerData, CacheData, CacheKey, Column, ComputeData, ConnectionKind,
    DatabaseData, Edge, Endpoint, ForeignKeyRef, HttpMethod, Index, IndexKind, LinkedQuery, Node,
    NodeKind, NodeType, Position, QueryKind, Scaling, Table, Topology, TopologyBuilder,
    TrafficSourceData, ValueType,
};
pub use tracing_setup::{LogLevel, TracingError};
