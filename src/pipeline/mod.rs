//! Stage plumbing: step shapes, the registry, the transport seam and the runner.

pub mod adapter;
pub mod registry;
pub mod runner;
pub mod step;
pub mod transport;
