//! Domain types and rules. Nothing in here performs I/O.

pub mod application;
pub mod money;
pub mod payment;
pub mod ports;
