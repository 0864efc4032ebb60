//! Statistics for stream sessions

pub mod metrics;

pub(crate) use metrics::SessionCounters;
pub use metrics::SessionStats;
