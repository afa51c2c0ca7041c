use glidegraph_core::Position;
use std::collections::HashMap;

use crate::render::VisualLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneEdgeId(pub u64);

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub label: String,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct SceneEdge {
    pub source: SceneNodeId,
    pub target: SceneNodeId,
    /// Endpoints as of the last geometry refresh.
    pub line: [Position; 2],
}

/// In-memory scene with no drawing backend. Keeps enough state to answer
/// where every node and edge would be drawn.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: HashMap<SceneNodeId, SceneNode>,
    edges: HashMap<SceneEdgeId, SceneEdge>,
    next_node: u64,
    next_edge: u64,
    pub geometry_refreshes: u64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: SceneEdgeId) -> Option<&SceneEdge> {
        self.edges.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn endpoint(&self, id: SceneNodeId) -> Position {
        self.nodes.get(&id).map(|n| n.pos).unwrap_or_default()
    }
}

impl VisualLayer for HeadlessScene {
    type NodeHandle = SceneNodeId;
    type EdgeHandle = SceneEdgeId;

    fn add_node(&mut self, pos: Position, label: &str) -> SceneNodeId {
        let id = SceneNodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            SceneNode {
                label: label.to_string(),
                pos,
            },
        );
        tracing::trace!(handle = id.0, label, %pos, "scene: node added");
        id
    }

    fn update_node_position(&mut self, node: &SceneNodeId, pos: Position) {
        match self.nodes.get_mut(node) {
            Some(n) => n.pos = pos,
            None => tracing::warn!(handle = node.0, "scene: move for unknown node handle"),
        }
    }

    fn remove_node(&mut self, node: SceneNodeId) {
        if self.nodes.remove(&node).is_none() {
            tracing::warn!(handle = node.0, "scene: remove for unknown node handle");
        }
    }

    fn add_edge(&mut self, source: &SceneNodeId, target: &SceneNodeId) -> SceneEdgeId {
        let id = SceneEdgeId(self.next_edge);
        self.next_edge += 1;
        let line = [self.endpoint(*source), self.endpoint(*target)];
        self.edges.insert(
            id,
            SceneEdge {
                source: *source,
                target: *target,
                line,
            },
        );
        tracing::trace!(handle = id.0, source = source.0, target = target.0, "scene: edge added");
        id
    }

    fn update_edge_geometry(&mut self, edge: &SceneEdgeId) {
        let Some((source, target)) = self.edges.get(edge).map(|e| (e.source, e.target)) else {
            tracing::warn!(handle = edge.0, "scene: redraw for unknown edge handle");
            return;
        };
        let line = [self.endpoint(source), self.endpoint(target)];
        if let Some(e) = self.edges.get_mut(edge) {
            if e.line != line {
                e.line = line;
                self.geometry_refreshes += 1;
            }
        }
    }

    fn remove_edge(&mut self, edge: SceneEdgeId) {
        if self.edges.remove(&edge).is_none() {
            tracing::warn!(handle = edge.0, "scene: remove for unknown edge handle");
        }
    }
}
