use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::graph::reconcile::{BatchReport, ReconcileReport};

#[derive(Debug, Clone)]
pub struct SyncStats {
    pub snapshots_applied: u64,
    pub snapshots_stale: u64,
    pub fetch_errors: u64,
    pub batches_applied: u64,
    pub positions_applied: u64,
    pub positions_dropped: u64,
    pub edges_redrawn: u64,
    pub edges_skipped: u64,
    pub msg_total: u64,
    pub msg_rate: f32,
    msg_window: VecDeque<Instant>,
    window: Duration,
}

impl Default for SyncStats {
    fn default() -> Self {
        Self {
            snapshots_applied: 0,
            snapshots_stale: 0,
            fetch_errors: 0,
            batches_applied: 0,
            positions_applied: 0,
            positions_dropped: 0,
            edges_redrawn: 0,
            edges_skipped: 0,
            msg_total: 0,
            msg_rate: 0.0,
            msg_window: VecDeque::new(),
            window: Duration::from_secs(2),
        }
    }
}

impl SyncStats {
    pub(crate) fn on_message(&mut self, now: Instant) {
        self.msg_total += 1;
        self.msg_window.push_back(now);
    }

    pub(crate) fn on_snapshot(&mut self, report: &ReconcileReport) {
        self.snapshots_applied += 1;
        self.edges_skipped += report.edges_skipped as u64;
    }

    pub(crate) fn on_batch(&mut self, report: &BatchReport) {
        self.batches_applied += 1;
        self.positions_applied += report.moved as u64;
        self.positions_dropped += report.dropped as u64;
        self.edges_redrawn += report.edges_redrawn as u64;
    }

    pub fn tick_metrics(&mut self, now: Instant) {
        while let Some(front) = self.msg_window.front() {
            if now.duration_since(*front) > self.window {
                self.msg_window.pop_front();
            } else {
                break;
            }
        }
        self.msg_rate = self.msg_window.len() as f32 / self.window.as_secs_f32();
    }

    pub fn log_summary(&self) {
        tracing::info!(
            snapshots = self.snapshots_applied,
            stale = self.snapshots_stale,
            fetch_errors = self.fetch_errors,
            batches = self.batches_applied,
            positions = self.positions_applied,
            dropped = self.positions_dropped,
            edges_redrawn = self.edges_redrawn,
            msg_rate = self.msg_rate,
            "sync stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_window_forgets_old_messages() {
        let mut stats = SyncStats::default();
        let t0 = Instant::now();
        stats.on_message(t0);
        stats.on_message(t0);
        stats.tick_metrics(t0 + Duration::from_secs(1));
        assert_eq!(stats.msg_rate, 1.0);

        stats.tick_metrics(t0 + Duration::from_secs(3));
        assert_eq!(stats.msg_rate, 0.0);
        assert_eq!(stats.msg_total, 2);
    }
}
