use glidegraph_core::{NodeId, Position};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First sighting; placed at its target without animation.
    Teleported,
    /// Already within tolerance; synced exactly onto the target.
    Settled,
    /// Needs interpolation this transition.
    Animate,
}

/// Displayed (`actual`) and authoritative (`target`) positions per node.
#[derive(Debug, Default)]
pub struct PositionStore {
    actual: HashMap<NodeId, Position>,
    target: HashMap<NodeId, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole target set and prunes `actual` down to it.
    pub fn replace_targets(&mut self, targets: HashMap<NodeId, Position>) {
        self.target = targets;
        let before = self.actual.len();
        let target = &self.target;
        self.actual.retain(|id, _| target.contains_key(id));
        let pruned = before - self.actual.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped positions for nodes absent from targets");
        }
    }

    pub fn classify(&mut self, id: &NodeId, tolerance: f64) -> Classification {
        let Some(target) = self.target.get(id).copied() else {
            tracing::warn!(node = %id, "classify: node has no target");
            return Classification::Settled;
        };
        match self.actual.get_mut(id) {
            None => {
                self.actual.insert(id.clone(), target);
                Classification::Teleported
            }
            Some(actual) if actual.within(&target, tolerance) => {
                *actual = target;
                Classification::Settled
            }
            Some(_) => Classification::Animate,
        }
    }

    /// Missing entries count as arrived.
    pub fn is_at_target(&self, id: &NodeId, tolerance: f64) -> bool {
        let Some(actual) = self.actual.get(id) else {
            tracing::warn!(node = %id, "is_at_target: node not in actual positions");
            return true;
        };
        let Some(target) = self.target.get(id) else {
            tracing::warn!(node = %id, "is_at_target: node has no target");
            return true;
        };
        actual.within(target, tolerance)
    }

    /// Advances one node toward its target; returns the new position if it moved.
    pub fn step(&mut self, id: &NodeId, fraction: f64, tolerance: f64) -> Option<Position> {
        let (Some(actual), Some(target)) = (self.actual.get_mut(id), self.target.get(id)) else {
            tracing::warn!(node = %id, "step: animated node missing from position store");
            return None;
        };
        if actual.within(target, tolerance) {
            return None;
        }
        actual.step_toward(target, fraction, tolerance).then_some(*actual)
    }

    pub fn actual(&self, id: &NodeId) -> Option<Position> {
        self.actual.get(id).copied()
    }

    pub fn target(&self, id: &NodeId) -> Option<Position> {
        self.target.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }

    pub fn tracks(&self, id: &NodeId) -> bool {
        self.actual.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(v: &[(&str, f64)]) -> HashMap<NodeId, Position> {
        v.iter()
            .map(|(id, x)| (NodeId::from(*id), Position::new(*x, 0.0, 0.0)))
            .collect()
    }

    #[test]
    fn classification_covers_new_settled_and_moving() {
        let mut store = PositionStore::new();
        store.replace_targets(targets(&[("a", 0.0), ("b", 5.0)]));
        assert_eq!(store.classify(&"a".into(), 0.01), Classification::Teleported);
        assert_eq!(store.classify(&"b".into(), 0.01), Classification::Teleported);

        store.replace_targets(targets(&[("a", 0.005), ("b", 50.0)]));
        assert_eq!(store.classify(&"a".into(), 0.01), Classification::Settled);
        assert_eq!(store.actual(&"a".into()), Some(Position::new(0.005, 0.0, 0.0)));
        assert_eq!(store.classify(&"b".into(), 0.01), Classification::Animate);
        assert_eq!(store.actual(&"b".into()), Some(Position::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn replacing_targets_prunes_actual() {
        let mut store = PositionStore::new();
        store.replace_targets(targets(&[("a", 0.0), ("b", 0.0)]));
        store.classify(&"a".into(), 0.01);
        store.classify(&"b".into(), 0.01);

        store.replace_targets(targets(&[("b", 1.0)]));
        assert!(!store.tracks(&"a".into()));
        assert!(store.tracks(&"b".into()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_node_counts_as_arrived() {
        let store = PositionStore::new();
        assert!(store.is_at_target(&"ghost".into(), 0.01));
    }
}
