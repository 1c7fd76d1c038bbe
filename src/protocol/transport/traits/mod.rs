//! Abstraction traits used by the transport layer.
pub mod frame_source;
