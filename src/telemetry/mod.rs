//! Runtime side of the decoder: the latest-value snapshot, the loop that
//! feeds it, and the sinks that persist it.
pub mod aggregator;
pub mod sink;
pub mod snapshot;
