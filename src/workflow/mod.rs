//! Typed model of the state-machine document the compiler emits.

mod definition;
mod verify;
pub mod visualizer;

pub use definition::*;
pub use visualizer::visualize_workflow;
