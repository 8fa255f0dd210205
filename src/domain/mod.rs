//! Domain types and the ports the coordinator depends on.

pub mod money;
pub mod order;
pub mod ports;
pub mod transaction;
