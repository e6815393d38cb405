//! Adjacency view of a topology.
//!
//! Nodes and edges are addressed by dense indices so that per-run state can
//! live in plain vectors and every iteration order follows the order of the
//! input diagram.

use std::collections::HashMap;

use archsim_core::{Edge, Node, NodeId, NodeType, Topology};
use tracing::debug;

use crate::behavior::NodeCapacity;

/// Dense index of a simulated node.
pub type NodeIx = usize;

/// Dense index of an edge.
pub type EdgeIx = usize;

/// Resolved adjacency of the simulated part of a topology.
///
/// Annotation nodes are left out. Edges whose endpoints do not resolve to
/// simulated nodes stay in the edge list but appear in no adjacency list.
#[derive(Debug)]
pub struct TopologyGraph<'a> {
    nodes: Vec<&'a Node>,
    capacities: Vec<NodeCapacity>,
    node_index: HashMap<&'a NodeId, NodeIx>,
    edges: Vec<&'a Edge>,
    endpoints: Vec<Option<(NodeIx, NodeIx)>>,
    outgoing: Vec<Vec<EdgeIx>>,
    incoming: Vec<Vec<EdgeIx>>,
    entry_points: Vec<NodeIx>,
}

impl<'a> TopologyGraph<'a> {
    /// Builds adjacency lists and enumerates traffic sources.
    pub fn build(topology: &'a Topology) -> Self {
        let mut nodes = Vec::new();
        let mut capacities = Vec::new();
        let mut node_index = HashMap::new();
        for node in &topology.nodes {
            let Some(capacity) = NodeCapacity::resolve(node) else {
                continue;
            };
            if node_index.contains_key(&node.id) {
                debug!(node = %node.id, "Duplicate node id ignored");
                continue;
            }
            node_index.insert(&node.id, nodes.len());
            nodes.push(node);
            capacities.push(capacity);
        }

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        let mut edges = Vec::with_capacity(topology.edges.len());
        let mut endpoints = Vec::with_capacity(topology.edges.len());

        for edge in &topology.edges {
            let ix = edges.len();
            let resolved = node_index
                .get(&edge.source)
                .copied()
                .zip(node_index.get(&edge.target).copied());
            match resolved {
                Some((source, target)) => {
                    outgoing[source].push(ix);
                    incoming[target].push(ix);
                }
                None => debug!(
                    edge = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "Edge endpoint does not resolve to a simulated node"
                ),
            }
            edges.push(edge);
            endpoints.push(resolved);
        }

        let entry_points = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type() == NodeType::TrafficSource)
            .map(|(ix, _)| ix)
            .collect();

        Self {
            nodes,
            capacities,
            node_index,
            edges,
            endpoints,
            outgoing,
            incoming,
            entry_points,
        }
    }

    /// Returns the number of simulated nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges, resolvable or not.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the node at `ix`.
    pub fn node(&self, ix: NodeIx) -> &'a Node {
        self.nodes[ix]
    }

    /// Returns the resolved capacity of the node at `ix`.
    pub fn capacity(&self, ix: NodeIx) -> NodeCapacity {
        self.capacities[ix]
    }

    /// Iterates simulated nodes in diagram order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIx, &'a Node)> + '_ {
        self.nodes.iter().copied().enumerate()
    }

    /// Resolves a node id to its index.
    pub fn node_ix(&self, id: &NodeId) -> Option<NodeIx> {
        self.node_index.get(id).copied()
    }

    /// Returns the edge at `ix`.
    pub fn edge(&self, ix: EdgeIx) -> &'a Edge {
        self.edges[ix]
    }

    /// Returns the resolved (source, target) of an edge.
    pub fn edge_endpoints(&self, ix: EdgeIx) -> Option<(NodeIx, NodeIx)> {
        self.endpoints[ix]
    }

    /// Returns outgoing edges of a node in diagram order.
    pub fn outgoing(&self, ix: NodeIx) -> &[EdgeIx] {
        &self.outgoing[ix]
    }

    /// Returns incoming edges of a node in diagram order.
    pub fn incoming(&self, ix: NodeIx) -> &[EdgeIx] {
        &self.incoming[ix]
    }

    /// Returns traffic-source nodes, the only originators of requests.
    pub fn entry_points(&self) -> &[NodeIx] {
        &self.entry_points
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::Scaling;

    use super::*;

    fn sample() -> Topology {
        Topology::builder()
            .traffic_source("users")
            .load_balancer("lb", Scaling::Single)
            .api_server("api", Scaling::Single, Vec::new())
            .annotation("note", "remember to shard")
            .database("db", Scaling::Single, Vec::new())
            .connect("users", "lb")
            .connect("lb", "api")
            .connect("api", "db")
            .connect("note", "api")
            .connect("api", "ghost")
            .build()
    }

    #[test]
    fn test_adjacency_lists() {
        let topology = sample();
        let graph = TopologyGraph::build(&topology);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);

        let api = graph.node_ix(&NodeId::new("api")).unwrap();
        assert_eq!(graph.outgoing(api), &[2]);
        assert_eq!(graph.incoming(api), &[1]);
    }

    #[test]
    fn test_annotations_and_dangling_edges_excluded() {
        let topology = sample();
        let graph = TopologyGraph::build(&topology);

        assert!(graph.node_ix(&NodeId::new("note")).is_none());
        assert_eq!(graph.edge_endpoints(3), None);
        assert_eq!(graph.edge_endpoints(4), None);
    }

    #[test]
    fn test_entry_points_are_traffic_sources_only() {
        // "orphan" has no incoming edges but is not a traffic source.
        let topology = Topology::builder()
            .traffic_source("a")
            .queue("orphan", Scaling::Single)
            .traffic_source("b")
            .build();
        let graph = TopologyGraph::build(&topology);

        let names: Vec<&str> = graph
            .entry_points()
            .iter()
            .map(|&ix| graph.node(ix).id.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
