//! Domain types and the ports the application layer talks through.
//!
//! Nothing in here performs I/O: classification, amount formatting, request
//! building and certificate fingerprinting are pure functions over values.

pub mod charge;
pub mod outcome;
pub mod pinning;
pub mod ports;
pub mod request;
pub mod response;
pub mod session;
