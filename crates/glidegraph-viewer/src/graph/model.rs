use glidegraph_core::{EdgeKey, NodeId, Position};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct VisualNode<H> {
    pub handle: H,
    /// Position from the most recent snapshot that carried this node.
    pub last_pos: Position,
    /// Position most recently pushed to the visual layer (snapshot or animation).
    pub shown: Position,
}

#[derive(Debug, Clone)]
pub struct VisualEdge<H> {
    pub handle: H,
}

/// node id -> keys of every edge touching it, as source or target.
#[derive(Debug, Default)]
pub struct Adjacency {
    map: HashMap<NodeId, HashSet<EdgeKey>>,
}

impl Adjacency {
    pub fn rebuild<'a>(&mut self, keys: impl Iterator<Item = &'a EdgeKey>) {
        self.map.clear();
        for key in keys {
            self.map
                .entry(key.source.clone())
                .or_default()
                .insert(key.clone());
            self.map
                .entry(key.target.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    pub fn edges_of(&self, id: &NodeId) -> Option<&HashSet<EdgeKey>> {
        self.map.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &HashSet<EdgeKey>)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loop_is_indexed_once() {
        let keys = [EdgeKey::new("a", "a"), EdgeKey::new("a", "b")];
        let mut adj = Adjacency::default();
        adj.rebuild(keys.iter());

        assert_eq!(adj.edges_of(&NodeId::from("a")).map(|s| s.len()), Some(2));
        assert_eq!(adj.edges_of(&NodeId::from("b")).map(|s| s.len()), Some(1));
        assert_eq!(adj.node_count(), 2);
    }
}
