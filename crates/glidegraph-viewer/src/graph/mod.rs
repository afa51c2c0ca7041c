pub mod metrics;
pub mod model;
pub mod reconcile;
pub mod state;

pub use state::Coordinator;
