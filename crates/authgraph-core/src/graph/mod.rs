mod builder;

pub use builder::{BuildError, GraphBuildError, SchemaGraphBuilder};

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Entity,
    Relation,
    Permission,
    Operation,
}

/// A typed graph node. Entity, relation, and permission nodes derive their id
/// from their schema position (`name`, `name#relation`, `name#permission`), so
/// the same schema always produces the same identities. Operation nodes get a
/// fresh token per occurrence since one rewrite tree can contain several
/// structurally identical operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub id: String,
    pub label: String,
}

impl Node {
    pub fn entity(name: &str) -> Self {
        Self {
            node_type: NodeType::Entity,
            id: name.to_string(),
            label: name.to_string(),
        }
    }

    pub fn relation(entity: &str, relation: &str) -> Self {
        Self {
            node_type: NodeType::Relation,
            id: format!("{entity}#{relation}"),
            label: relation.to_string(),
        }
    }

    pub fn permission(entity: &str, permission: &str) -> Self {
        Self {
            node_type: NodeType::Permission,
            id: format!("{entity}#{permission}"),
            label: permission.to_string(),
        }
    }

    pub fn operation(label: &str) -> Self {
        Self {
            node_type: NodeType::Operation,
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
        }
    }
}

/// A directed edge between two nodes, with an optional opaque payload. Edges
/// are never deduplicated: multiplicity mirrors the rewrite tree's branching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Append-only accumulator of nodes and edges. All mutation goes through one
/// mutex so sub-graphs built on different threads can be merged into a shared
/// accumulator; readers get cloned snapshots.
#[derive(Debug, Default)]
pub struct Graph {
    inner: Mutex<GraphInner>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        self.inner.lock().unwrap().nodes.push(node);
    }

    pub fn add_nodes(&self, nodes: Vec<Node>) {
        self.inner.lock().unwrap().nodes.extend(nodes);
    }

    pub fn add_edge(&self, from: Node, to: Node, extra: Option<serde_json::Value>) {
        self.inner.lock().unwrap().edges.push(Edge { from, to, extra });
    }

    pub fn add_edges(&self, edges: Vec<Edge>) {
        self.inner.lock().unwrap().edges.extend(edges);
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.inner.lock().unwrap().nodes.clone()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.inner.lock().unwrap().edges.clone()
    }

    /// Merges another graph's contents into this one by concatenation.
    pub fn merge(&self, other: Graph) {
        let other = other.inner.into_inner().unwrap();
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.extend(other.nodes);
        inner.edges.extend(other.edges);
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let inner = self.inner.lock().unwrap();
        GraphSnapshot {
            nodes: inner.nodes.clone(),
            edges: inner.edges.clone(),
        }
    }
}

/// The wire shape consumed by the visualization front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}
