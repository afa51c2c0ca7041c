pub mod headless;

use glidegraph_core::Position;
use std::fmt::Debug;

pub use headless::HeadlessScene;

/// Capabilities the sync core needs from whatever draws the graph.
///
/// Handles are opaque to the core; it only stores them and hands them back.
pub trait VisualLayer {
    type NodeHandle: Clone + Debug;
    type EdgeHandle: Clone + Debug;

    fn add_node(&mut self, pos: Position, label: &str) -> Self::NodeHandle;
    fn update_node_position(&mut self, node: &Self::NodeHandle, pos: Position);
    fn remove_node(&mut self, node: Self::NodeHandle);

    fn add_edge(&mut self, source: &Self::NodeHandle, target: &Self::NodeHandle)
        -> Self::EdgeHandle;
    /// Re-reads both endpoint positions and redraws the edge.
    fn update_edge_geometry(&mut self, edge: &Self::EdgeHandle);
    fn remove_edge(&mut self, edge: Self::EdgeHandle);
}
