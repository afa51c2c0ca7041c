use glidegraph_core::{EdgeKey, NodeId, Position, PositionBatch, Snapshot};
use std::collections::{HashMap, HashSet};

use crate::graph::model::{Adjacency, VisualEdge, VisualNode};
use crate::render::VisualLayer;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub edges_added: Vec<EdgeKey>,
    pub edges_removed: Vec<EdgeKey>,
    pub edges_skipped: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.edges_added.is_empty()
            && self.edges_removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub moved: usize,
    pub dropped: usize,
    pub edges_redrawn: usize,
}

/// Keeps the visual layer's nodes and edges in line with the latest snapshot.
pub struct Reconciler<V: VisualLayer> {
    visual: V,
    nodes: HashMap<NodeId, VisualNode<V::NodeHandle>>,
    edges: HashMap<EdgeKey, VisualEdge<V::EdgeHandle>>,
    adjacency: Adjacency,
}

impl<V: VisualLayer> Reconciler<V> {
    pub fn new(visual: V) -> Self {
        Self {
            visual,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            adjacency: Adjacency::default(),
        }
    }

    /// Applies `snapshot` as the complete new membership. Nodes are settled
    /// before edges, and the adjacency index is rebuilt last.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // a repeated id takes its last position but is visited once, in first-seen order
        let latest: HashMap<&NodeId, Position> =
            snapshot.nodes.iter().map(|n| (&n.id, n.pos())).collect();
        let mut present: HashSet<&NodeId> = HashSet::with_capacity(latest.len());
        for node in &snapshot.nodes {
            if !present.insert(&node.id) {
                continue;
            }
            let pos = latest[&node.id];
            match self.nodes.get_mut(&node.id) {
                None => {
                    let handle = self.visual.add_node(pos, node.id.as_str());
                    self.nodes.insert(
                        node.id.clone(),
                        VisualNode {
                            handle,
                            last_pos: pos,
                            shown: pos,
                        },
                    );
                    tracing::debug!(node = %node.id, %pos, "node added");
                    report.added.push(node.id.clone());
                }
                Some(rec) if rec.last_pos != pos => {
                    self.visual.update_node_position(&rec.handle, pos);
                    rec.last_pos = pos;
                    rec.shown = pos;
                    tracing::debug!(node = %node.id, %pos, "node moved");
                    report.updated.push(node.id.clone());
                }
                Some(_) => {}
            }
        }

        let mut gone: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        gone.sort();
        for id in gone {
            if let Some(rec) = self.nodes.remove(&id) {
                self.visual.remove_node(rec.handle);
                tracing::debug!(node = %id, "node removed");
                report.removed.push(id);
            }
        }

        let mut seen: HashSet<EdgeKey> = HashSet::with_capacity(snapshot.edges.len());
        for edge in &snapshot.edges {
            let (Some(src), Some(dst)) = (self.nodes.get(&edge.source), self.nodes.get(&edge.target))
            else {
                tracing::warn!(
                    source = %edge.source,
                    target = %edge.target,
                    "skipping edge with unknown endpoint"
                );
                report.edges_skipped += 1;
                continue;
            };
            let key = edge.key();
            if !self.edges.contains_key(&key) {
                let handle = self.visual.add_edge(&src.handle, &dst.handle);
                tracing::debug!(edge = %key, "edge added");
                self.edges.insert(key.clone(), VisualEdge { handle });
                report.edges_added.push(key.clone());
            }
            seen.insert(key);
        }

        let mut stale: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        stale.sort();
        for key in stale {
            if let Some(edge) = self.edges.remove(&key) {
                self.visual.remove_edge(edge.handle);
                tracing::debug!(edge = %key, "edge removed");
                report.edges_removed.push(key);
            }
        }

        self.adjacency.rebuild(self.edges.keys());
        report
    }

    /// Pushes animated positions to the visual layer and redraws only the
    /// edges that touch a moved node.
    pub fn apply_positions(&mut self, batch: &PositionBatch) -> BatchReport {
        let mut report = BatchReport::default();
        let mut touched: HashSet<&EdgeKey> = HashSet::new();

        for update in &batch.nodes {
            let Some(rec) = self.nodes.get_mut(&update.node_id) else {
                tracing::warn!(node = %update.node_id, "position update for untracked node");
                report.dropped += 1;
                continue;
            };
            self.visual.update_node_position(&rec.handle, update.pos);
            rec.shown = update.pos;
            report.moved += 1;
            if let Some(keys) = self.adjacency.edges_of(&update.node_id) {
                touched.extend(keys.iter());
            }
        }

        for key in touched {
            match self.edges.get(key) {
                Some(edge) => {
                    self.visual.update_edge_geometry(&edge.handle);
                    report.edges_redrawn += 1;
                }
                None => tracing::warn!(edge = %key, "adjacency references a missing edge"),
            }
        }

        report
    }

    pub fn node(&self, id: &NodeId) -> Option<&VisualNode<V::NodeHandle>> {
        self.nodes.get(id)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&VisualEdge<V::EdgeHandle>> {
        self.edges.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn visual(&self) -> &V {
        &self.visual
    }
}
