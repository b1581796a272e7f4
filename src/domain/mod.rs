//! Value objects, entities and the ports the pipeline stages depend on.

pub mod files;
pub mod money;
pub mod payment;
pub mod ports;
