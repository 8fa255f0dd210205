//! Adapters implementing the domain ports.

pub mod approval_channel;
pub mod http_gateway;
pub mod in_memory;
pub mod reporters;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scripted;
