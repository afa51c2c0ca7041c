use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::source::GraphData;

#[derive(Debug, Clone, Copy)]
pub struct DriftSettings {
    pub interval: Duration,
    pub amount: f64,
    pub max_position: f64,
}

/// Periodically nudges node positions so viewers have something to animate.
pub fn spawn(graph: Arc<RwLock<GraphData>>, settings: DriftSettings, mut rng: StdRng) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let moved = graph
                .write()
                .await
                .drift(settings.amount, settings.max_position, &mut rng);
            tracing::debug!(moved, "graph drifted");
        }
    })
}
