use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use glidegraph_core::Msg;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::RwLock;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::source::GraphData;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run(sock_path: &str, graph: Arc<RwLock<GraphData>>) -> Result<()> {
    let listener =
        UnixListener::bind(sock_path).with_context(|| format!("bind UDS {sock_path}"))?;
    tracing::info!(sock_path, "glidegraph-agent listening");
    serve(listener, graph).await
}

async fn serve(listener: UnixListener, graph: Arc<RwLock<GraphData>>) -> Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await.context("accept viewer")?;
        tracing::debug!("viewer connected");
        let graph = Arc::clone(&graph);
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, graph).await {
                tracing::warn!(error = %format!("{e:#}"), "viewer connection ended with error");
            }
        });
    }
}

/// Answers requests until the viewer hangs up. A frame that is not a valid
/// request gets an error reply and the connection stays open.
async fn handle_conn(stream: UnixStream, graph: Arc<RwLock<GraphData>>) -> Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let bytes = frame.context("read frame")?;
        let reply = match serde_json::from_slice::<Msg>(&bytes) {
            Ok(Msg::Hello { version }) => {
                tracing::debug!(%version, "viewer hello");
                Msg::Hello {
                    version: VERSION.into(),
                }
            }
            Ok(Msg::RequestSnapshot) => {
                let snapshot = graph.read().await.snapshot();
                tracing::debug!(
                    nodes = snapshot.nodes.len(),
                    edges = snapshot.edges.len(),
                    "serving snapshot"
                );
                Msg::Data(snapshot)
            }
            Ok(other) => Msg::Error {
                error: format!("unexpected request: {}", kind_name(&other)),
            },
            Err(e) => Msg::Error {
                error: format!("malformed request: {e}"),
            },
        };
        framed
            .send(Bytes::from(serde_json::to_vec(&reply)?))
            .await
            .context("send reply")?;
    }
    Ok(())
}

fn kind_name(msg: &Msg) -> &'static str {
    match msg {
        Msg::Hello { .. } => "hello",
        Msg::RequestSnapshot => "request_snapshot",
        Msg::Data(_) => "data",
        Msg::Batch(_) => "batch",
        Msg::Error { .. } => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glidegraph_core::{Position, PositionBatch, Snapshot};

    async fn start(graph: GraphData) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent.sock");
        let listener = UnixListener::bind(&path).expect("bind");
        tokio::spawn(serve(listener, Arc::new(RwLock::new(graph))));
        (dir, path)
    }

    async fn roundtrip(framed: &mut Framed<UnixStream, LengthDelimitedCodec>, req: &[u8]) -> Msg {
        framed.send(Bytes::copy_from_slice(req)).await.expect("send");
        let bytes = framed.next().await.expect("frame").expect("bytes");
        serde_json::from_slice(&bytes).expect("decode reply")
    }

    #[tokio::test]
    async fn answers_hello_and_snapshot_requests() {
        let graph = GraphData::from_json(
            r#"{"nodes":[{"id":"b","x":4},{"id":"a"}],"edges":[{"source":"b","target":"a"}]}"#,
        )
        .expect("graph");
        let (_dir, path) = start(graph).await;
        let stream = UnixStream::connect(&path).await.expect("connect");
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        let hello = serde_json::to_vec(&Msg::Hello {
            version: "test".into(),
        })
        .expect("encode");
        assert_eq!(
            roundtrip(&mut framed, &hello).await,
            Msg::Hello {
                version: VERSION.into()
            }
        );

        let req = serde_json::to_vec(&Msg::RequestSnapshot).expect("encode");
        let Msg::Data(Snapshot { nodes, edges }) = roundtrip(&mut framed, &req).await else {
            panic!("expected data reply");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].pos(), Position::new(4.0, 0.0, 0.0));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source.as_str(), "a");
        assert_eq!(edges[0].target.as_str(), "b");
    }

    #[tokio::test]
    async fn bad_requests_get_error_replies() {
        let (_dir, path) = start(GraphData::default()).await;
        let stream = UnixStream::connect(&path).await.expect("connect");
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        let Msg::Error { error } = roundtrip(&mut framed, b"not json").await else {
            panic!("expected error reply");
        };
        assert!(error.contains("malformed"));

        let batch = serde_json::to_vec(&Msg::Batch(PositionBatch::default())).expect("encode");
        let Msg::Error { error } = roundtrip(&mut framed, &batch).await else {
            panic!("expected error reply");
        };
        assert!(error.contains("batch"));

        // connection survives both errors
        let req = serde_json::to_vec(&Msg::RequestSnapshot).expect("encode");
        assert!(matches!(roundtrip(&mut framed, &req).await, Msg::Data(_)));
    }
}
