//! Typed diagram nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cache::CacheKey;
use super::endpoint::Endpoint;
use super::schema::Table;
use crate::ids::NodeId;

/// Closed set of node type tags.
///
/// Annotation nodes are freeform notes and never take part in simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    TrafficSource,
    LoadBalancer,
    Cdn,
    ApiServer,
    Database,
    ObjectStore,
    Cache,
    Queue,
    Annotation,
}

impl NodeType {
    /// Returns the kebab-case tag used in serialized diagrams.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::TrafficSource => "traffic-source",
            NodeType::LoadBalancer => "load-balancer",
            NodeType::Cdn => "cdn",
            NodeType::ApiServer => "api-server",
            NodeType::Database => "database",
            NodeType::ObjectStore => "object-store",
            NodeType::Cache => "cache",
            NodeType::Queue => "queue",
            NodeType::Annotation => "annotation",
        }
    }

    /// Returns true for node types that take part in simulation.
    pub fn is_simulated(self) -> bool {
        !matches!(self, NodeType::Annotation)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas position. Carried through for round-tripping, ignored by simulation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// How many instances of a service are provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Scaling {
    /// One instance.
    #[default]
    Single,
    /// A fixed number of instances.
    Fixed { instances: u32 },
    /// Elastic scaling between bounds.
    ///
    /// Runs use `min_instances` as a fixed baseline; instance counts do not
    /// react to load mid-run.
    #[serde(rename_all = "camelCase")]
    Auto {
        min_instances: u32,
        max_instances: u32,
    },
}

impl Scaling {
    /// Resolves the instance count used for capacity calculations.
    ///
    /// Never returns zero.
    pub fn instances(self) -> u32 {
        match self {
            Scaling::Single => 1,
            Scaling::Fixed { instances } => instances.max(1),
            Scaling::Auto { min_instances, .. } => min_instances.max(1),
        }
    }
}

/// Payload shared by every service node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputeData {
    pub label: Option<String>,
    pub scaling: Scaling,
}

/// Payload of a traffic-source node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrafficSourceData {
    pub label: Option<String>,
}

/// Payload of an api-server node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiServerData {
    #[serde(flatten)]
    pub compute: ComputeData,
    pub endpoints: Vec<Endpoint>,
}

/// Payload of a database node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseData {
    #[serde(flatten)]
    pub compute: ComputeData,
    pub tables: Vec<Table>,
}

/// Payload of a cache node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheData {
    #[serde(flatten)]
    pub compute: ComputeData,
    pub keys: Vec<CacheKey>,
}

/// Payload of a freeform annotation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationData {
    pub text: String,
}

/// Type tag plus type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum NodeKind {
    TrafficSource(TrafficSourceData),
    LoadBalancer(ComputeData),
    Cdn(ComputeData),
    ApiServer(ApiServerData),
    Database(DatabaseData),
    ObjectStore(ComputeData),
    Cache(CacheData),
    Queue(ComputeData),
    Annotation(AnnotationData),
}

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    pub kind: NodeKind,
}

impl Node {
    /// Creates a node at the canvas origin.
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind,
        }
    }

    /// Returns the node's type tag.
    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::TrafficSource(_) => NodeType::TrafficSource,
            NodeKind::LoadBalancer(_) => NodeType::LoadBalancer,
            NodeKind::Cdn(_) => NodeType::Cdn,
            NodeKind::ApiServer(_) => NodeType::ApiServer,
            NodeKind::Database(_) => NodeType::Database,
            NodeKind::ObjectStore(_) => NodeType::ObjectStore,
            NodeKind::Cache(_) => NodeType::Cache,
            NodeKind::Queue(_) => NodeType::Queue,
            NodeKind::Annotation(_) => NodeType::Annotation,
        }
    }

    /// Returns the compute payload for service nodes.
    pub fn compute(&self) -> Option<&ComputeData> {
        match &self.kind {
            NodeKind::LoadBalancer(c)
            | NodeKind::Cdn(c)
            | NodeKind::ObjectStore(c)
            | NodeKind::Queue(c) => Some(c),
            NodeKind::ApiServer(d) => Some(&d.compute),
            NodeKind::Database(d) => Some(&d.compute),
            NodeKind::Cache(d) => Some(&d.compute),
            NodeKind::TrafficSource(_) | NodeKind::Annotation(_) => None,
        }
    }

    /// Returns the user-facing label, falling back to the node id.
    pub fn label(&self) -> &str {
        let label = match &self.kind {
            NodeKind::TrafficSource(d) => d.label.as_deref(),
            NodeKind::Annotation(_) => None,
            _ => self.compute().and_then(|c| c.label.as_deref()),
        };
        label.unwrap_or(self.id.as_str())
    }

    /// Returns the provisioned scaling mode. Nodes without one run single-instance.
    pub fn scaling(&self) -> Scaling {
        self.compute().map(|c| c.scaling).unwrap_or_default()
    }

    /// Returns tables owned by a database node, empty otherwise.
    pub fn tables(&self) -> &[Table] {
        match &self.kind {
            NodeKind::Database(d) => &d.tables,
            _ => &[],
        }
    }

    /// Returns keys owned by a cache node, empty otherwise.
    pub fn cache_keys(&self) -> &[CacheKey] {
        match &self.kind {
            NodeKind::Cache(d) => &d.keys,
            _ => &[],
        }
    }

    /// Returns endpoints owned by an api-server node, empty otherwise.
    pub fn endpoints(&self) -> &[Endpoint] {
        match &self.kind {
            NodeKind::ApiServer(d) => &d.endpoints,
            _ => &[],
        }
    }
}
