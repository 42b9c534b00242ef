//! Statistics aggregator.

pub mod aggregator;
pub mod snapshot;
