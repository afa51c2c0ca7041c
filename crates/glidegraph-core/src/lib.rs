use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every coordinate is strictly closer than `tolerance` to `target`.
    pub fn within(&self, target: &Position, tolerance: f64) -> bool {
        (self.x - target.x).abs() < tolerance
            && (self.y - target.y).abs() < tolerance
            && (self.z - target.z).abs() < tolerance
    }

    /// Moves `fraction` of the remaining distance toward `target` on each axis,
    /// then snaps any axis left within `tolerance` exactly onto the target.
    ///
    /// Returns whether the position changed.
    pub fn step_toward(&mut self, target: &Position, fraction: f64, tolerance: f64) -> bool {
        let before = *self;
        self.x = step_axis(self.x, target.x, fraction, tolerance);
        self.y = step_axis(self.y, target.y, fraction, tolerance);
        self.z = step_axis(self.z, target.z, fraction, tolerance);
        *self != before
    }

    /// Largest per-axis distance to `other`.
    pub fn max_residual(&self, other: &Position) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

fn step_axis(actual: f64, target: f64, fraction: f64, tolerance: f64) -> f64 {
    let next = actual + (target - actual) * fraction;
    // At large magnitudes the step can round back to `actual`; snap so the axis still lands.
    if next == actual || (target - next).abs() < tolerance {
        target
    } else {
        next
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SnapshotNode {
    pub fn new(id: impl Into<String>, pos: Position) -> Self {
        Self {
            id: NodeId(id.into()),
            x: pos.x,
            y: pos.y,
            z: pos.z,
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl SnapshotEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: NodeId(source.into()),
            target: NodeId(target.into()),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

/// Complete graph membership at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

/// Order-sensitive edge identity: `a -> b` and `b -> a` are distinct edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: NodeId(source.into()),
            target: NodeId(target.into()),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionUpdate {
    #[serde(rename = "nodeId")]
    pub node_id: NodeId,
    pub pos: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PositionBatch {
    pub nodes: Vec<PositionUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    Hello { version: String },
    RequestSnapshot,
    Data(Snapshot),
    Batch(PositionBatch),
    Error { error: String },
}
