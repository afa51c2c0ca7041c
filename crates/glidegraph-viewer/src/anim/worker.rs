use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use glidegraph_core::Snapshot;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use crate::anim::scheduler::{AnimationScheduler, TransitionParams};
use crate::net::Incoming;

pub const ANIMATOR_STREAM: &str = "animator";

/// Coordination-side end of the animation context.
#[derive(Debug, Clone)]
pub struct AnimatorHandle {
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl AnimatorHandle {
    pub(crate) fn from_sender(tx: mpsc::UnboundedSender<Snapshot>) -> Self {
        Self { tx }
    }

    /// Hands a new target set to the animation context. Returns false once
    /// that context has shut down.
    pub fn begin_transition(&self, snapshot: Snapshot) -> bool {
        self.tx.send(snapshot).is_ok()
    }
}

/// Starts the animation context on its own thread and single-threaded runtime.
/// Batches come back on `out` as [`Incoming`] messages.
pub fn spawn_animator(
    params: TransitionParams,
    tick: Duration,
    out: Sender<Incoming>,
) -> Result<AnimatorHandle> {
    if tick.is_zero() {
        anyhow::bail!("animation tick interval must be non-zero");
    }
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build animator runtime")?;
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("glidegraph-animator".into())
        .spawn(move || {
            rt.block_on(run(AnimationScheduler::new(params), tick, rx, out));
        })
        .context("spawn animator thread")?;

    Ok(AnimatorHandle::from_sender(tx))
}

async fn run(
    mut scheduler: AnimationScheduler,
    tick: Duration,
    mut rx: mpsc::UnboundedReceiver<Snapshot>,
    out: Sender<Incoming>,
) {
    let mut ticker: Option<Interval> = None;

    loop {
        tokio::select! {
            biased;

            next = rx.recv() => {
                let Some(snapshot) = next else {
                    break;
                };
                // Drop the pending timer before touching state.
                ticker = None;
                if scheduler.begin_transition(&snapshot.nodes) > 0 {
                    let mut t = tokio::time::interval(tick);
                    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker = Some(t);
                }
            }

            _ = next_tick(&mut ticker) => {
                if !scheduler.is_active() {
                    ticker = None;
                    continue;
                }
                if let Some(batch) = scheduler.tick() {
                    if out.send(Incoming::batch(ANIMATOR_STREAM.into(), batch)).is_err() {
                        break;
                    }
                }
                if !scheduler.is_active() {
                    ticker = None;
                }
            }
        }
    }

    tracing::debug!(generation = scheduler.generation(), "animator stopped");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
