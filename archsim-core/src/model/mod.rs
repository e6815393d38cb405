//! Diagram data model consumed by the simulation engine.
//!
//! A [`Topology`] is a flat collection of typed [`Node`]s and directed
//! [`Edge`]s. It is immutable for the duration of a simulation run.

mod cache;
mod endpoint;
mod node;
mod schema;
mod topology;

pub use cache::{CacheKey, ValueType};
pub use endpoint::{Endpoint, HttpMethod, LinkedQuery, QueryKind};
pub use node::{
    AnnotationData, ApiServerData, CacheData, ComputeData, DatabaseData, Node, NodeKind, NodeType,
    Position, Scaling, TrafficSourceData,
};
pub use schema::{Column, ForeignKeyRef, Index, IndexKind, Table};
pub use topology::{ConnectionKind, Edge, Topology, TopologyBuilder};
