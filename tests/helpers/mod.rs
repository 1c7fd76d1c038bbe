/// Test doubles to simulate the receiver and the persistence sink during
/// integration tests.
use ecu_telemetry::error::PersistError;
use ecu_telemetry::protocol::transport::can_frame::RawFrame;
use ecu_telemetry::protocol::transport::traits::frame_source::FrameSource;
use ecu_telemetry::telemetry::sink::PersistenceSink;
use ecu_telemetry::telemetry::snapshot::SnapshotView;
use tokio::sync::mpsc;

type Injected = Result<RawFrame, String>;

/// Frame source fed through a `tokio` channel, like the SocketCAN thread.
/// Dropping every sender ends the stream.
pub struct MockFrameSource {
    rx: mpsc::UnboundedReceiver<Injected>,
}

impl MockFrameSource {
    /// Construct the source and the handle used to inject frames.
    pub fn create() -> (mpsc::UnboundedSender<Injected>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl FrameSource for MockFrameSource {
    type Error = String;

    async fn recv(&mut self) -> Result<Option<RawFrame>, Self::Error> {
        match self.rx.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }
}

#[derive(Default)]
/// Sink keeping every view it is handed.
pub struct RecordingSink {
    pub views: Vec<SnapshotView>,
}

impl PersistenceSink for RecordingSink {
    fn persist(&mut self, view: &SnapshotView) -> Result<(), PersistError> {
        self.views.push(*view);
        Ok(())
    }
}

/// Build a frame from test vectors.
pub fn frame(id: u32, payload: &[u8]) -> RawFrame {
    RawFrame::new(id, payload).expect("payload fits a classic frame")
}
