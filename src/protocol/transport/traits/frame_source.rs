//! Minimal abstraction for the receiver collaborator. Allows the aggregator
//! to plug into various transports (SocketCAN thread, replay file, test
//! channel, etc.).
use core::future::Future;

use crate::protocol::transport::can_frame::RawFrame;

/// Contract to receive raw frames asynchronously.
pub trait FrameSource {
    type Error: core::fmt::Debug;

    /// Retrieve the next available frame. Waits until data arrives.
    ///
    /// `Ok(None)` signals a clean end of stream; an error is a fatal
    /// transport condition. Implementations must be cancellation-safe:
    /// dropping the future before completion loses no frame.
    fn recv(&mut self) -> impl Future<Output = Result<Option<RawFrame>, Self::Error>> + '_;
}
