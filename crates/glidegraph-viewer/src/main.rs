mod anim;
mod graph;
mod net;
mod render;
mod util;

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use graph::Coordinator;
use render::HeadlessScene;
use std::time::Instant;
use util::config::{self, AgentEndpointKind};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let mut cfg = config::load_or_init();
    if let Some(path) = std::env::var("GLIDEGRAPH_SOCK")
        .ok()
        .filter(|s| !s.trim().is_empty())
    {
        cfg.agent.kind = AgentEndpointKind::UdsPath(path);
    }
    let params = cfg.validate()?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let animator = anim::spawn_animator(params, cfg.animation.tick_interval(), tx.clone())?;
    net::spawn_poller(cfg.agent.sock_path().to_string(), cfg.poll_settings(), tx)?;

    tracing::info!(
        agent = cfg.agent.sock_path(),
        poll_ms = cfg.poll_interval_ms,
        tick_ms = cfg.animation.tick_interval_ms,
        step = params.step_fraction(),
        tolerance = params.tolerance(),
        "glidegraph viewer started"
    );

    let mut coord = Coordinator::new(HeadlessScene::new(), animator);
    let stats_every = cfg.stats_interval();
    let mut last_stats = Instant::now();

    loop {
        match rx.recv_timeout(stats_every) {
            Ok(inc) => {
                coord.apply(inc);
                coord.pump(&rx, cfg.pump_max);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("all producers stopped; exiting");
                break;
            }
        }

        let now = Instant::now();
        if now.duration_since(last_stats) >= stats_every {
            coord.stats.tick_metrics(now);
            coord.stats.log_summary();
            last_stats = now;
        }
    }

    Ok(())
}
