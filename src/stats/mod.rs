//! Hub and peer statistics

pub mod metrics;

pub use metrics::{HubStats, HubStatsSnapshot, PeerStats};
