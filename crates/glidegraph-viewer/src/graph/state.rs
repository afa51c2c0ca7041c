use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::time::Instant;

use crate::anim::AnimatorHandle;
use crate::graph::metrics::SyncStats;
use crate::graph::reconcile::Reconciler;
use crate::net::{Incoming, IncomingKind};
use crate::render::VisualLayer;

/// Coordination side: keeps the visual layer in sync with fetched snapshots
/// and applies animation batches as they arrive.
pub struct Coordinator<V: VisualLayer> {
    reconciler: Reconciler<V>,
    animator: AnimatorHandle,
    last_seq: HashMap<String, u64>,
    animator_alive: bool,
    pub stats: SyncStats,
}

impl<V: VisualLayer> Coordinator<V> {
    pub fn new(visual: V, animator: AnimatorHandle) -> Self {
        Self {
            reconciler: Reconciler::new(visual),
            animator,
            last_seq: HashMap::new(),
            animator_alive: true,
            stats: SyncStats::default(),
        }
    }

    /// Drains up to `max` queued messages without blocking.
    pub fn pump(&mut self, rx: &Receiver<Incoming>, max: usize) -> usize {
        let mut n = 0;
        for msg in rx.try_iter().take(max) {
            self.apply(msg);
            n += 1;
        }
        n
    }

    pub fn apply(&mut self, inc: Incoming) {
        self.stats.on_message(Instant::now());
        let Incoming { stream, kind } = inc;
        match kind {
            IncomingKind::Snapshot { seq, snapshot } => {
                if let Some(last) = self.last_seq.get(&stream) {
                    if seq <= *last {
                        tracing::debug!(%stream, seq, last, "dropping out-of-order snapshot");
                        self.stats.snapshots_stale += 1;
                        return;
                    }
                }
                self.last_seq.insert(stream, seq);

                let report = self.reconciler.reconcile(&snapshot);
                tracing::info!(
                    seq,
                    added = report.added.len(),
                    updated = report.updated.len(),
                    removed = report.removed.len(),
                    edges_added = report.edges_added.len(),
                    edges_removed = report.edges_removed.len(),
                    edges_skipped = report.edges_skipped,
                    linked_nodes = self.reconciler.adjacency().node_count(),
                    "snapshot reconciled"
                );
                self.stats.on_snapshot(&report);

                if !self.animator.begin_transition(snapshot) && self.animator_alive {
                    self.animator_alive = false;
                    tracing::error!("animator is gone; positions will no longer animate");
                }
            }
            IncomingKind::Batch(batch) => {
                let report = self.reconciler.apply_positions(&batch);
                tracing::trace!(
                    moved = report.moved,
                    dropped = report.dropped,
                    edges = report.edges_redrawn,
                    "batch applied"
                );
                self.stats.on_batch(&report);
            }
            IncomingKind::Error(error) => {
                tracing::warn!(%stream, %error, "snapshot fetch failed");
                self.stats.fetch_errors += 1;
            }
            IncomingKind::Connected => tracing::info!(%stream, "agent reachable"),
            IncomingKind::Disconnected => tracing::info!(%stream, "agent unreachable"),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<V> {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessScene;
    use glidegraph_core::{
        NodeId, Position, PositionBatch, PositionUpdate, Snapshot, SnapshotEdge, SnapshotNode,
    };
    use tokio::sync::mpsc;

    fn coordinator() -> (Coordinator<HeadlessScene>, mpsc::UnboundedReceiver<Snapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let c = Coordinator::new(HeadlessScene::new(), AnimatorHandle::from_sender(tx));
        (c, rx)
    }

    fn snapshot(x: f64) -> Snapshot {
        Snapshot {
            nodes: vec![
                SnapshotNode::new("n1", Position::new(x, 0.0, 0.0)),
                SnapshotNode::new("n2", Position::new(0.0, 1.0, 0.0)),
            ],
            edges: vec![SnapshotEdge::new("n1", "n2")],
        }
    }

    #[test]
    fn snapshot_is_reconciled_then_forwarded() {
        let (mut c, mut rx) = coordinator();
        c.apply(Incoming::snapshot("agent".into(), 1, snapshot(0.0)));

        assert_eq!(c.reconciler().node_count(), 2);
        assert_eq!(c.reconciler().edge_count(), 1);
        let forwarded = rx.try_recv().expect("animator got snapshot");
        assert_eq!(forwarded, snapshot(0.0));
    }

    #[test]
    fn older_snapshot_is_dropped() {
        let (mut c, mut rx) = coordinator();
        c.apply(Incoming::snapshot("agent".into(), 2, snapshot(5.0)));
        c.apply(Incoming::snapshot("agent".into(), 1, snapshot(0.0)));

        assert_eq!(c.stats.snapshots_stale, 1);
        let rec = c.reconciler().node(&NodeId::from("n1")).expect("n1");
        assert_eq!(rec.last_pos, Position::new(5.0, 0.0, 0.0));
        rx.try_recv().expect("first forwarded");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn batch_for_removed_node_is_dropped_quietly() {
        let (mut c, _rx) = coordinator();
        c.apply(Incoming::snapshot("agent".into(), 1, snapshot(0.0)));
        c.apply(Incoming::batch(
            "animator".into(),
            PositionBatch {
                nodes: vec![
                    PositionUpdate {
                        node_id: "n1".into(),
                        pos: Position::new(3.0, 0.0, 0.0),
                    },
                    PositionUpdate {
                        node_id: "n9".into(),
                        pos: Position::new(3.0, 0.0, 0.0),
                    },
                ],
            },
        ));

        assert_eq!(c.stats.positions_applied, 1);
        assert_eq!(c.stats.positions_dropped, 1);
        assert_eq!(c.stats.edges_redrawn, 1);
    }

    #[test]
    fn fetch_error_changes_nothing() {
        let (mut c, _rx) = coordinator();
        c.apply(Incoming::snapshot("agent".into(), 1, snapshot(0.0)));
        c.apply(Incoming::error("agent".into(), "connection refused".into()));

        assert_eq!(c.stats.fetch_errors, 1);
        assert_eq!(c.reconciler().node_count(), 2);
    }

    #[test]
    fn pump_drains_queue_up_to_limit() {
        let (mut c, _rx) = coordinator();
        let (tx, rx) = crossbeam_channel::unbounded();
        for seq in 1..=3 {
            tx.send(Incoming::snapshot("agent".into(), seq, snapshot(seq as f64)))
                .expect("send");
        }
        assert_eq!(c.pump(&rx, 2), 2);
        assert_eq!(c.pump(&rx, 10), 1);
        assert_eq!(c.stats.snapshots_applied, 3);
    }

    #[test]
    fn closed_animator_does_not_stop_reconciliation() {
        let (mut c, rx) = coordinator();
        drop(rx);
        c.apply(Incoming::snapshot("agent".into(), 1, snapshot(0.0)));
        c.apply(Incoming::snapshot("agent".into(), 2, snapshot(1.0)));
        assert_eq!(c.stats.snapshots_applied, 2);
    }
}
