pub mod scheduler;
pub mod store;
pub mod worker;

pub use worker::{spawn_animator, AnimatorHandle};
