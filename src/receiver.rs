//! SocketCAN receiver: a blocking reader thread feeding the aggregator over
//! a bounded channel.
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ecu_telemetry::protocol::layouts::LayoutTable;
use ecu_telemetry::protocol::transport::can_frame::RawFrame;
use ecu_telemetry::protocol::transport::can_id::CanId;
use ecu_telemetry::protocol::transport::traits::frame_source::FrameSource;
use socketcan::{CanFilter, CanFrame, CanSocket, Socket, SocketOptions};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Extended frame format flag of the Linux `can_id` word.
const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Poll period of the blocking read; bounds shutdown latency.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Frames buffered between the reader thread and the loop.
const CHANNEL_CAPACITY: usize = 256;

type Received = Result<RawFrame, io::Error>;

/// Receiving end handed to the aggregator.
pub struct ChannelSource {
    rx: mpsc::Receiver<Received>,
}

impl FrameSource for ChannelSource {
    type Error = io::Error;

    async fn recv(&mut self) -> Result<Option<RawFrame>, Self::Error> {
        match self.rx.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }
}

/// Open `interface`, install one acceptance filter per layout identifier,
/// and start the reader thread.
pub fn spawn(
    interface: &str,
    table: &LayoutTable,
    idle_timeout: Duration,
) -> io::Result<(ChannelSource, JoinHandle<()>)> {
    let socket = CanSocket::open(interface)?;

    let filters: Vec<CanFilter> = table.identifiers().map(acceptance_filter).collect();
    socket.set_filters(&filters)?;
    info!(interface, filters = filters.len(), "listening on CAN interface");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = thread::Builder::new()
        .name("can-receiver".to_owned())
        .spawn(move || read_loop(socket, tx, idle_timeout))?;

    Ok((ChannelSource { rx }, handle))
}

fn acceptance_filter(id: CanId) -> CanFilter {
    if id.is_standard() {
        CanFilter::new(id.raw(), CAN_EFF_FLAG | id.exact_mask())
    } else {
        CanFilter::new(id.raw() | CAN_EFF_FLAG, CAN_EFF_FLAG | id.exact_mask())
    }
}

fn read_loop(socket: CanSocket, tx: mpsc::Sender<Received>, idle_timeout: Duration) {
    let mut last_activity = Instant::now();

    while !tx.is_closed() {
        let received = match socket.read_frame_timeout(READ_TIMEOUT) {
            Ok(CanFrame::Data(frame)) => match RawFrame::from_embedded(&frame) {
                Some(raw) => Ok(raw),
                None => continue,
            },
            Ok(CanFrame::Remote(_)) => {
                trace!("dropping remote frame");
                continue;
            }
            Ok(CanFrame::Error(_)) => {
                debug!("dropping error frame");
                continue;
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                if last_activity.elapsed() >= idle_timeout {
                    warn!(
                        timeout = %humantime::format_duration(idle_timeout),
                        "no CAN frame received, still waiting"
                    );
                    last_activity = Instant::now();
                }
                continue;
            }
            Err(error) => Err(error),
        };

        last_activity = Instant::now();
        let failed = received.is_err();
        if tx.blocking_send(received).is_err() || failed {
            break;
        }
    }
    debug!("CAN receiver thread exiting");
}
