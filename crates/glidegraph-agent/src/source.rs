use anyhow::{Context, Result};
use glidegraph_core::{NodeId, Position, Snapshot, SnapshotEdge, SnapshotNode};
use rand::Rng;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

/// The agent's authoritative graph. Edges are undirected and stored once as
/// an ordered `(low, high)` pair.
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    nodes: Vec<(NodeId, Position)>,
    index: HashMap<NodeId, usize>,
    edges: BTreeSet<(NodeId, NodeId)>,
}

#[derive(Debug, Deserialize)]
struct FileGraph {
    #[serde(default)]
    nodes: Vec<FileNode>,
    #[serde(default)]
    edges: Vec<FileEdge>,
}

#[derive(Debug, Deserialize)]
struct FileNode {
    id: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
}

#[derive(Debug, Deserialize)]
struct FileEdge {
    source: String,
    target: String,
}

impl GraphData {
    /// `node_count` nodes named `node_<i>` scattered uniformly in the cube
    /// `±max_position`, joined by up to `edge_count` distinct edges.
    pub fn random<R: Rng>(node_count: usize, edge_count: usize, max_position: f64, rng: &mut R) -> Self {
        let mut graph = GraphData::default();
        for i in 0..node_count {
            let pos = Position::new(
                rng.gen_range(-max_position..=max_position),
                rng.gen_range(-max_position..=max_position),
                rng.gen_range(-max_position..=max_position),
            );
            graph.insert_node(NodeId(format!("node_{i}")), pos);
        }

        let max_edges = node_count * node_count.saturating_sub(1) / 2;
        let wanted = edge_count.min(max_edges);
        while graph.edges.len() < wanted {
            let a = rng.gen_range(0..node_count);
            let b = rng.gen_range(0..node_count);
            if a == b {
                continue;
            }
            let (a, b) = (graph.nodes[a].0.clone(), graph.nodes[b].0.clone());
            graph.insert_edge(a, b);
        }
        graph
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read graph file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parse graph file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: FileGraph = serde_json::from_str(text)?;
        let mut graph = GraphData::default();
        for node in file.nodes {
            let id = NodeId(node.id);
            if graph.index.contains_key(&id) {
                tracing::warn!(node = %id, "duplicate node id in graph file; keeping first");
                continue;
            }
            graph.insert_node(id, Position::new(node.x, node.y, node.z));
        }
        for edge in file.edges {
            let (source, target) = (NodeId(edge.source), NodeId(edge.target));
            if !graph.index.contains_key(&source) || !graph.index.contains_key(&target) {
                tracing::warn!(%source, %target, "graph file edge references unknown node");
                continue;
            }
            if source == target {
                tracing::debug!(node = %source, "ignoring self-loop");
                continue;
            }
            graph.insert_edge(source, target);
        }
        Ok(graph)
    }

    fn insert_node(&mut self, id: NodeId, pos: Position) {
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push((id, pos));
    }

    fn insert_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let pair = if a < b { (a, b) } else { (b, a) };
        self.edges.insert(pair)
    }

    /// Moves roughly half of the nodes by up to `amount` per axis, clamped to
    /// `±max_position`. Returns how many nodes moved.
    pub fn drift<R: Rng>(&mut self, amount: f64, max_position: f64, rng: &mut R) -> usize {
        if amount <= 0.0 {
            return 0;
        }
        let mut moved = 0;
        for (_, pos) in self.nodes.iter_mut() {
            if !rng.gen_bool(0.5) {
                continue;
            }
            let mut jitter = |v: f64| (v + rng.gen_range(-amount..=amount)).clamp(-max_position, max_position);
            let next = Position::new(jitter(pos.x), jitter(pos.y), jitter(pos.z));
            if next != *pos {
                *pos = next;
                moved += 1;
            }
        }
        moved
    }

    /// Wire snapshot; each edge appears once with `source < target`.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, pos)| SnapshotNode::new(id.0.clone(), *pos))
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|(a, b)| SnapshotEdge {
                    source: a.clone(),
                    target: b.clone(),
                })
                .collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
