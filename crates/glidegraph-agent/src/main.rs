mod config;
mod drift;
mod server;
mod source;

use anyhow::{Context, Result};
use config::{parse_args, SourceKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use source::GraphData;
use std::sync::Arc;
use tokio::sync::RwLock;

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn runtime_sock_path() -> String {
    if let Ok(path) = std::env::var("GLIDEGRAPH_SOCK") {
        if !path.trim().is_empty() {
            return path;
        }
    }
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        format!("{dir}/glidegraph.sock")
    } else {
        "/tmp/glidegraph.sock".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = parse_args()?;
    let sock_path = config.sock_path.clone().unwrap_or_else(runtime_sock_path);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let graph = match config.source {
        SourceKind::Random => {
            GraphData::random(config.nodes, config.edges, config.max_position, &mut rng)
        }
        SourceKind::File => {
            let path = config
                .file
                .as_deref()
                .context("--source file expects --file <path>")?;
            GraphData::load_file(path)?
        }
    };
    tracing::info!(
        source = ?config.source,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );
    let graph = Arc::new(RwLock::new(graph));

    // stale socket from a previous run
    let _ = std::fs::remove_file(&sock_path);

    if config.drift > 0.0 {
        drift::spawn(
            Arc::clone(&graph),
            drift::DriftSettings {
                interval: config.drift_interval,
                amount: config.drift,
                max_position: config.max_position,
            },
            StdRng::seed_from_u64(rng.gen()),
        );
    }

    server::run(&sock_path, graph).await
}
