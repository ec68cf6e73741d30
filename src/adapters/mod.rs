//! Adapters Layer
//!
//! Inbound: the operator command line.
//! Outbound: statistics backends implementing the domain ports.

pub mod inbound;
pub mod outbound;
