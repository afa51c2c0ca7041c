use crate::net::Incoming;
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use futures_util::{SinkExt, StreamExt};
use glidegraph_core::{Msg, Snapshot};
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::time::MissedTickBehavior;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Polls the agent socket for snapshots on a fixed interval. Attempts run one
/// after another, so at most one fetch is ever in flight.
pub fn spawn_poller(sock_path: String, settings: PollSettings, tx: Sender<Incoming>) -> Result<()> {
    if sock_path.trim().is_empty() {
        anyhow::bail!("agent socket path is empty");
    }
    if settings.interval.is_zero() {
        anyhow::bail!("poll interval must be non-zero");
    }
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build poller runtime")?;

    std::thread::Builder::new()
        .name("glidegraph-poller".into())
        .spawn(move || rt.block_on(run(sock_path, settings, tx)))
        .context("spawn poller thread")?;
    Ok(())
}

async fn run(sock_path: String, settings: PollSettings, tx: Sender<Incoming>) {
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq: u64 = 0;
    let mut reachable = false;

    loop {
        ticker.tick().await;
        seq += 1;
        let attempt = tokio::time::timeout(settings.timeout, fetch_snapshot(&sock_path))
            .await
            .unwrap_or_else(|_| {
                Err(anyhow::anyhow!("fetch timed out after {:?}", settings.timeout))
            });
        let inc = match attempt {
            Ok(snapshot) => {
                if !reachable {
                    reachable = true;
                    if tx.send(Incoming::connected(sock_path.clone())).is_err() {
                        break;
                    }
                }
                Incoming::snapshot(sock_path.clone(), seq, snapshot)
            }
            Err(e) => {
                if reachable {
                    reachable = false;
                    let _ = tx.send(Incoming::disconnected(sock_path.clone()));
                }
                Incoming::error(sock_path.clone(), format!("{e:#}"))
            }
        };
        if tx.send(inc).is_err() {
            break;
        }
    }
}

/// One request/response round trip against the agent.
pub async fn fetch_snapshot(sock_path: &str) -> Result<Snapshot> {
    let stream = UnixStream::connect(sock_path)
        .await
        .with_context(|| format!("connect UDS {sock_path}"))?;
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    framed
        .send(Bytes::from(serde_json::to_vec(&Msg::RequestSnapshot)?))
        .await
        .context("send snapshot request")?;

    while let Some(frame) = framed.next().await {
        let bytes = frame.context("read frame")?;
        match serde_json::from_slice::<Msg>(&bytes).context("decode agent message")? {
            Msg::Data(snapshot) => return Ok(snapshot),
            Msg::Error { error } => anyhow::bail!("agent error: {error}"),
            _ => continue,
        }
    }
    anyhow::bail!("agent closed connection before sending a snapshot")
}
