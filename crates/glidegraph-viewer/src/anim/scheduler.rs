use anyhow::Result;
use glidegraph_core::{NodeId, Position, PositionBatch, PositionUpdate, SnapshotNode};
use std::collections::{HashMap, HashSet};

use crate::anim::store::{Classification, PositionStore};

pub const DEFAULT_STEP_FRACTION: f64 = 0.1;
pub const DEFAULT_BATCH_FRACTION: f64 = 1.0 / 3.0;
pub const DEFAULT_TOLERANCE_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionParams {
    step_fraction: f64,
    batch_fraction: f64,
    tolerance: f64,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            step_fraction: DEFAULT_STEP_FRACTION,
            batch_fraction: DEFAULT_BATCH_FRACTION,
            tolerance: DEFAULT_STEP_FRACTION * DEFAULT_TOLERANCE_RATIO,
        }
    }
}

impl TransitionParams {
    pub fn new(step_fraction: f64, batch_fraction: f64, tolerance: f64) -> Result<Self> {
        if !(step_fraction > 0.0 && step_fraction <= 1.0) {
            anyhow::bail!("step fraction must be in (0, 1], got {step_fraction}");
        }
        if !(batch_fraction > 0.0 && batch_fraction <= 1.0) {
            anyhow::bail!("batch fraction must be in (0, 1], got {batch_fraction}");
        }
        if !(tolerance > 0.0 && tolerance < step_fraction) {
            anyhow::bail!(
                "tolerance must be positive and below the step fraction ({step_fraction}), got {tolerance}"
            );
        }
        Ok(Self {
            step_fraction,
            batch_fraction,
            tolerance,
        })
    }

    /// Tolerance expressed as a ratio of the step fraction.
    pub fn with_ratio(step_fraction: f64, batch_fraction: f64, ratio: f64) -> Result<Self> {
        Self::new(step_fraction, batch_fraction, step_fraction * ratio)
    }

    pub fn step_fraction(&self) -> f64 {
        self.step_fraction
    }

    pub fn batch_fraction(&self) -> f64 {
        self.batch_fraction
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn batch_size(&self, animating: usize) -> usize {
        ((animating as f64 * self.batch_fraction).ceil() as usize).max(1)
    }
}

/// Moves nodes toward their latest targets a few at a time.
///
/// Each `tick` processes the next slice of the animated set; after the last
/// slice the whole set is checked and either the transition ends or the
/// cursor wraps for another pass.
#[derive(Debug)]
pub struct AnimationScheduler {
    params: TransitionParams,
    store: PositionStore,
    animating: Vec<NodeId>,
    batch_size: usize,
    cursor: usize,
    generation: u64,
}

impl AnimationScheduler {
    pub fn new(params: TransitionParams) -> Self {
        Self {
            params,
            store: PositionStore::new(),
            animating: Vec::new(),
            batch_size: 1,
            cursor: 0,
            generation: 0,
        }
    }

    /// Supersedes any running transition. Returns how many nodes will animate.
    pub fn begin_transition(&mut self, nodes: &[SnapshotNode]) -> usize {
        self.generation += 1;
        self.animating.clear();
        self.cursor = 0;

        let targets: HashMap<NodeId, Position> =
            nodes.iter().map(|n| (n.id.clone(), n.pos())).collect();
        self.store.replace_targets(targets);

        let tolerance = self.params.tolerance;
        let mut teleported = 0usize;
        let mut seen: HashSet<&NodeId> = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if !seen.insert(&node.id) {
                continue;
            }
            match self.store.classify(&node.id, tolerance) {
                Classification::Teleported => teleported += 1,
                Classification::Settled => {}
                Classification::Animate => self.animating.push(node.id.clone()),
            }
        }

        self.batch_size = self.params.batch_size(self.animating.len());
        tracing::debug!(
            generation = self.generation,
            targets = nodes.len(),
            teleported,
            animating = self.animating.len(),
            batch_size = self.batch_size,
            "transition started"
        );
        self.animating.len()
    }

    /// Runs one step. Returns the positions that changed, if any.
    pub fn tick(&mut self) -> Option<PositionBatch> {
        if self.animating.is_empty() {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.batch_size).min(self.animating.len());
        let (fraction, tolerance) = (self.params.step_fraction, self.params.tolerance);

        let mut updates = Vec::new();
        for id in &self.animating[start..end] {
            if let Some(pos) = self.store.step(id, fraction, tolerance) {
                updates.push(PositionUpdate {
                    node_id: id.clone(),
                    pos,
                });
            }
        }
        self.cursor = end;

        if self.cursor >= self.animating.len() {
            if self.all_arrived() {
                tracing::debug!(
                    generation = self.generation,
                    nodes = self.animating.len(),
                    "transition converged"
                );
                self.animating.clear();
                self.cursor = 0;
            } else {
                self.cursor = 0;
            }
        }

        (!updates.is_empty()).then_some(PositionBatch { nodes: updates })
    }

    fn all_arrived(&self) -> bool {
        let tolerance = self.params.tolerance;
        self.animating
            .iter()
            .all(|id| self.store.is_at_target(id, tolerance))
    }

    pub fn is_active(&self) -> bool {
        !self.animating.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn animating(&self) -> &[NodeId] {
        &self.animating
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn params(&self) -> &TransitionParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(v: &[(&str, f64, f64, f64)]) -> Vec<SnapshotNode> {
        v.iter()
            .map(|(id, x, y, z)| SnapshotNode::new(*id, Position::new(*x, *y, *z)))
            .collect()
    }

    fn run_to_end(s: &mut AnimationScheduler, max_ticks: usize) -> Vec<PositionBatch> {
        let mut out = Vec::new();
        for _ in 0..max_ticks {
            if !s.is_active() {
                return out;
            }
            if let Some(b) = s.tick() {
                out.push(b);
            }
        }
        panic!("transition still active after {max_ticks} ticks");
    }

    #[test]
    fn rejects_tolerance_not_below_step() {
        assert!(TransitionParams::new(0.1, 0.5, 0.1).is_err());
        assert!(TransitionParams::new(0.1, 0.5, 0.0).is_err());
        assert!(TransitionParams::new(0.0, 0.5, 0.01).is_err());
        assert!(TransitionParams::new(0.1, 0.0, 0.01).is_err());
        assert!(TransitionParams::with_ratio(0.1, 1.0 / 3.0, 0.1).is_ok());
    }

    #[test]
    fn moving_a_known_node_animates_to_exact_target() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        assert_eq!(s.begin_transition(&nodes(&[("n1", 0.0, 0.0, 0.0)])), 0);
        assert!(s.tick().is_none());

        assert_eq!(s.begin_transition(&nodes(&[("n1", 100.0, 0.0, 0.0)])), 1);
        let first = s.tick().expect("first batch");
        assert_eq!(
            first.nodes,
            vec![PositionUpdate {
                node_id: "n1".into(),
                pos: Position::new(10.0, 0.0, 0.0),
            }]
        );

        let batches = run_to_end(&mut s, 500);
        let last = batches.last().expect("more batches");
        assert_eq!(last.nodes[0].pos, Position::new(100.0, 0.0, 0.0));
        assert_eq!(s.store().actual(&"n1".into()), Some(Position::new(100.0, 0.0, 0.0)));
        assert!(s.tick().is_none());
    }

    #[test]
    fn new_nodes_are_never_animated() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        let n = nodes(&[("a", 1.0, 2.0, 3.0), ("b", -4.0, 5.0, 6.0)]);
        assert_eq!(s.begin_transition(&n), 0);
        assert!(!s.is_active());
        assert_eq!(s.store().actual(&"a".into()), Some(Position::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn residual_shrinks_monotonically_until_converged() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 0.0, 0.0, 0.0), ("b", 0.0, 0.0, 0.0)]));
        s.begin_transition(&nodes(&[("a", 37.5, -12.0, 900.0), ("b", -0.3, 0.0, 0.02)]));

        let residual = |s: &AnimationScheduler, id: &str| {
            let id = NodeId::from(id);
            let actual = s.store().actual(&id).expect("actual");
            actual.max_residual(&s.store().target(&id).expect("target"))
        };
        let mut last = (residual(&s, "a"), residual(&s, "b"));
        let mut ticks = 0;
        while s.is_active() {
            s.tick();
            let now = (residual(&s, "a"), residual(&s, "b"));
            assert!(now.0 <= last.0 && now.1 <= last.1);
            last = now;
            ticks += 1;
            assert!(ticks < 1000, "did not converge");
        }
        assert_eq!(last, (0.0, 0.0));
    }

    #[test]
    fn converges_at_coordinates_coarser_than_tolerance() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 1e14, 0.0, 0.0)]));
        assert_eq!(s.begin_transition(&nodes(&[("a", 1e14 + 1000.0, 0.0, 0.0)])), 1);

        run_to_end(&mut s, 1000);
        assert_eq!(
            s.store().actual(&"a".into()),
            Some(Position::new(1e14 + 1000.0, 0.0, 0.0))
        );
    }

    #[test]
    fn batches_walk_the_animated_set_in_slices() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        let start = nodes(&[
            ("a", 0.0, 0.0, 0.0),
            ("b", 0.0, 0.0, 0.0),
            ("c", 0.0, 0.0, 0.0),
            ("d", 0.0, 0.0, 0.0),
        ]);
        s.begin_transition(&start);
        let moved = nodes(&[
            ("a", 10.0, 0.0, 0.0),
            ("b", 10.0, 0.0, 0.0),
            ("c", 10.0, 0.0, 0.0),
            ("d", 10.0, 0.0, 0.0),
        ]);
        assert_eq!(s.begin_transition(&moved), 4);

        let ids = |b: PositionBatch| -> Vec<String> {
            b.nodes.into_iter().map(|u| u.node_id.0).collect()
        };
        // ceil(4 / 3) = 2 per slice
        assert_eq!(ids(s.tick().expect("slice 1")), vec!["a", "b"]);
        assert_eq!(ids(s.tick().expect("slice 2")), vec!["c", "d"]);
        assert_eq!(ids(s.tick().expect("wrap")), vec!["a", "b"]);
    }

    #[test]
    fn settled_nodes_sync_exactly_and_are_skipped() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 0.0, 0.0, 0.0)]));
        assert_eq!(s.begin_transition(&nodes(&[("a", 0.001, 0.0, 0.0)])), 0);
        assert_eq!(s.store().actual(&"a".into()), Some(Position::new(0.001, 0.0, 0.0)));
    }

    #[test]
    fn removed_nodes_are_pruned() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 0.0, 0.0, 0.0), ("b", 0.0, 0.0, 0.0)]));
        s.begin_transition(&nodes(&[("b", 0.0, 0.0, 0.0)]));
        assert!(!s.store().tracks(&"a".into()));
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn new_transition_supersedes_without_snapping_back() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 0.0, 0.0, 0.0)]));
        s.begin_transition(&nodes(&[("a", 100.0, 0.0, 0.0)]));
        for _ in 0..5 {
            s.tick();
        }
        let midway = s.store().actual(&"a".into()).expect("actual");
        assert!(midway.x > 0.0 && midway.x < 100.0);

        let gen_a = s.generation();
        s.begin_transition(&nodes(&[("a", -100.0, 0.0, 0.0)]));
        assert!(s.generation() > gen_a);
        assert_eq!(s.store().actual(&"a".into()), Some(midway));

        let first = s.tick().expect("batch toward new target");
        assert!(first.nodes[0].pos.x < midway.x);

        let batches = run_to_end(&mut s, 1000);
        for b in &batches {
            for u in &b.nodes {
                assert!(u.pos.x <= midway.x, "moved toward stale target: {:?}", u.pos);
            }
        }
        assert_eq!(s.store().actual(&"a".into()), Some(Position::new(-100.0, 0.0, 0.0)));
    }

    #[test]
    fn snapped_coordinate_stays_exact() {
        let mut s = AnimationScheduler::new(TransitionParams::default());
        s.begin_transition(&nodes(&[("a", 0.0, 0.0, 0.0)]));
        // y is off by less than the step would ever overshoot
        s.begin_transition(&nodes(&[("a", 50.0, 0.005, 0.0)]));
        s.tick();
        let after = s.store().actual(&"a".into()).expect("actual");
        assert_eq!(after.y, 0.005);
        while s.is_active() {
            s.tick();
            assert_eq!(s.store().actual(&"a".into()).expect("actual").y, 0.005);
        }
    }
}
