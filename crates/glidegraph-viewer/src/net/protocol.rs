use glidegraph_core::{PositionBatch, Snapshot};

/// Everything the coordination loop can receive, tagged with the stream it
/// came from.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub stream: String,
    pub kind: IncomingKind,
}

#[derive(Debug, Clone)]
pub enum IncomingKind {
    Connected,
    Disconnected,
    /// `seq` increases by one per fetch attempt on a stream.
    Snapshot { seq: u64, snapshot: Snapshot },
    Batch(PositionBatch),
    Error(String),
}

impl Incoming {
    pub fn connected(stream: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Connected,
        }
    }

    pub fn disconnected(stream: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Disconnected,
        }
    }

    pub fn snapshot(stream: String, seq: u64, snapshot: Snapshot) -> Self {
        Self {
            stream,
            kind: IncomingKind::Snapshot { seq, snapshot },
        }
    }

    pub fn batch(stream: String, batch: PositionBatch) -> Self {
        Self {
            stream,
            kind: IncomingKind::Batch(batch),
        }
    }

    pub fn error(stream: String, msg: String) -> Self {
        Self {
            stream,
            kind: IncomingKind::Error(msg),
        }
    }
}
