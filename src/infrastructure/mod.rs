//! Adapters for the domain ports and the runtime resources stages share.

pub mod ack_inbox;
pub mod blocking;
pub mod in_memory;
pub mod mock_provider;
pub mod rate_limiter;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
