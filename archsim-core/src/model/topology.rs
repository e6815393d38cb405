//! Diagram topology: nodes plus directed edges.

use serde::{Deserialize, Serialize};

use super::node::{
    AnnotationData, ApiServerData, CacheData, ComputeData, DatabaseData, Node, NodeKind, Scaling,
    TrafficSourceData,
};
use super::{CacheKey, Endpoint, Table};
use crate::ids::{EdgeId, NodeId};

/// Protocol carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Http,
    Websocket,
    Database,
    Cache,
}

/// A directed connection from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub kind: ConnectionKind,
}

impl Edge {
    /// Creates an HTTP edge.
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: ConnectionKind::Http,
        }
    }

    /// Sets the connection kind.
    pub fn with_kind(mut self, kind: ConnectionKind) -> Self {
        self.kind = kind;
        self
    }
}

/// The diagram as handed over by the editor.
///
/// Structural validity (unique ids, edges pointing at existing nodes) is the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Topology {
    /// Creates a topology from raw collections.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Starts a fluent builder.
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Fluent construction of topologies for tests and programmatic callers.
///
/// Edge ids are generated as `e<n>` in insertion order.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl TopologyBuilder {
    /// Adds an arbitrary node.
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a traffic source.
    pub fn traffic_source(self, id: &str) -> Self {
        self.node(Node::new(id, NodeKind::TrafficSource(TrafficSourceData::default())))
    }

    /// Adds a load balancer.
    pub fn load_balancer(self, id: &str, scaling: Scaling) -> Self {
        self.node(Node::new(id, NodeKind::LoadBalancer(compute(scaling))))
    }

    /// Adds a CDN.
    pub fn cdn(self, id: &str, scaling: Scaling) -> Self {
        self.node(Node::new(id, NodeKind::Cdn(compute(scaling))))
    }

    /// Adds an api-server with endpoints.
    pub fn api_server(self, id: &str, scaling: Scaling, endpoints: Vec<Endpoint>) -> Self {
        self.node(Node::new(
            id,
            NodeKind::ApiServer(ApiServerData {
                compute: compute(scaling),
                endpoints,
            }),
        ))
    }

    /// Adds a database with tables.
    pub fn database(self, id: &str, scaling: Scaling, tables: Vec<Table>) -> Self {
        self.node(Node::new(
            id,
            NodeKind::Database(DatabaseData {
                compute: compute(scaling),
                tables,
            }),
        ))
    }

    /// Adds an object store.
    pub fn object_store(self, id: &str, scaling: Scaling) -> Self {
        self.node(Node::new(id, NodeKind::ObjectStore(compute(scaling))))
    }

    /// Adds a cache with keys.
    pub fn cache(self, id: &str, scaling: Scaling, keys: Vec<CacheKey>) -> Self {
        self.node(Node::new(
            id,
            NodeKind::Cache(CacheData {
                compute: compute(scaling),
                keys,
            }),
        ))
    }

    /// Adds a queue.
    pub fn queue(self, id: &str, scaling: Scaling) -> Self {
        self.node(Node::new(id, NodeKind::Queue(compute(scaling))))
    }

    /// Adds a freeform note.
    pub fn annotation(self, id: &str, text: &str) -> Self {
        self.node(Node::new(
            id,
            NodeKind::Annotation(AnnotationData {
                text: text.to_string(),
            }),
        ))
    }

    /// Connects two nodes over HTTP.
    pub fn connect(self, source: &str, target: &str) -> Self {
        self.connect_with(source, target, ConnectionKind::Http)
    }

    /// Connects two nodes with an explicit connection kind.
    pub fn connect_with(mut self, source: &str, target: &str, kind: ConnectionKind) -> Self {
        let id = format!("e{}", self.edges.len());
        self.edges.push(Edge::new(id, source, target).with_kind(kind));
        self
    }

    /// Finishes the topology.
    pub fn build(self) -> Topology {
        Topology::new(self.nodes, self.edges)
    }
}

fn compute(scaling: Scaling) -> ComputeData {
    ComputeData {
        label: None,
        scaling,
    }
}
