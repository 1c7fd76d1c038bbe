//! In-memory representation of a classic CAN frame as handed to the decoder.
use embedded_can::Frame;

use crate::protocol::transport::can_id::CanId;

/// Classic CAN payload capacity.
pub const MAX_PAYLOAD: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw frame as read from the CAN bus.
pub struct RawFrame {
    /// Identifier value.
    pub id: CanId,
    /// Extended (29-bit) frame format. A standard and an extended frame
    /// with the same numeric identifier are different frames.
    pub extended: bool,
    /// Payload buffer. Only the first `len` bytes are meaningful.
    pub data: [u8; MAX_PAYLOAD],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
}

impl RawFrame {
    /// Build a frame from an identifier and up to eight payload bytes.
    /// The frame format follows the identifier: standard up to 0x7FF,
    /// extended above. Returns `None` when the payload is longer than a
    /// classic frame or the identifier does not fit in 29 bits.
    pub fn new(id: u32, payload: &[u8]) -> Option<Self> {
        Self::with_format(CanId(id), !CanId(id).is_standard(), payload)
    }

    /// Extended-format frame, whatever the identifier value.
    pub fn new_extended(id: u32, payload: &[u8]) -> Option<Self> {
        Self::with_format(CanId(id), true, payload)
    }

    fn with_format(id: CanId, extended: bool, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_PAYLOAD || !id.is_valid() || (!extended && !id.is_standard()) {
            return None;
        }
        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            extended,
            data,
            len: payload.len(),
        })
    }

    /// Convert any `embedded_can` data frame. Remote frames carry no payload
    /// and are rejected.
    pub fn from_embedded<F: Frame>(frame: &F) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        Self::with_format(CanId::from(frame.id()), frame.is_extended(), frame.data())
    }

    /// Whether the frame has the format a layout with identifier `id`
    /// describes: standard up to 0x7FF, extended above.
    pub fn matches_layout_format(&self, id: u32) -> bool {
        self.extended != CanId(id).is_standard()
    }

    /// Immutable view over the populated bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len.min(MAX_PAYLOAD)]
    }
}
