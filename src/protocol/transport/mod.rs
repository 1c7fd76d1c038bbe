//! CAN transport layer as seen by the decoder: identifiers, raw frames, and
//! the receive abstraction implemented by external receivers.
pub mod can_frame;
pub mod can_id;
pub mod traits;
