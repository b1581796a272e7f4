//! Edges of the system: the file formats and the wire messages between stages.

pub mod csv;
pub mod wire;
