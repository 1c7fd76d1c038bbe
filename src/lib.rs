//! `ecu-telemetry` library: decodes the broadcast frames of an engine ECU
//! into a latest-value telemetry snapshot and persists that snapshot every
//! time it changes. The crate exposes the layout descriptors, the decoding
//! engine, the CAN transport primitives, and the aggregation runtime.
//==================================================================================
/// Core data types shared by the layout table and the decoding engine.
pub mod core;
/// Layout configuration, bit access, and persistence errors.
pub mod error;
/// Bit reader and decoding engine.
pub mod infra;
/// Broadcast layout table and CAN transport (identifiers, frames, sources).
pub mod protocol;
/// Snapshot, aggregator loop, and persistence sinks.
pub mod telemetry;
//==================================================================================

pub use crate::core::{Channel, FieldUpdate, FrameLayout};
pub use crate::infra::codec::engine::decode;
pub use crate::protocol::layouts::LayoutTable;
pub use crate::protocol::transport::can_frame::RawFrame;
pub use crate::telemetry::aggregator::{Aggregator, AggregatorOptions, StopReason};
pub use crate::telemetry::snapshot::{SnapshotView, TelemetrySnapshot};
