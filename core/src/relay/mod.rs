//! Relay bookkeeping
//!
//! Nodes behind NAT are reached through relay servers. The directory records,
//! per node, which relays other peers should be told to use.

pub mod directory;

pub use directory::{RelayDirectory, RelaySet};
