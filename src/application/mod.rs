//! The payment stages.
//!
//! Each stage is a step of one of the four cardinalities in
//! [`crate::pipeline::step`]. [`stages::register_stages`] makes them available
//! under stable ids and the runner composes them.

pub mod audit;
pub mod folder;
pub mod input_file;
pub mod output_file;
pub mod polling;
pub mod send;
pub mod stages;
pub mod status;
