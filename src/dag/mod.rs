// src/dag/mod.rs

//! Task graph: registration, resolution, ordering and the scheduler itself.
//!
//! - [`registry`] stores task records for the current generation.
//! - [`resolver`] maps declared dependency titles to task indices.
//! - [`toposort`] orders tasks with Kahn's algorithm and reports cycles.
//! - [`plan`] combines the two into the engine's input.
//! - [`scheduler`] owns the generation lifecycle and the public API.

pub(crate) mod plan;
pub(crate) mod registry;
pub(crate) mod resolver;
pub mod scheduler;
pub mod toposort;

pub use scheduler::Scheduler;
pub use toposort::{topological_order, Cycle};
