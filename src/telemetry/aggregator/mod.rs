//! Aggregator loop: consume raw frames, decode them, merge the results into
//! the shared snapshot, and hand a view to the persistence sink whenever the
//! snapshot changed.
//!
//! The loop has two states, [`LoopState::Running`] and the terminal
//! [`LoopState::Stopped`]. It stops when the source ends, when the source
//! reports a transport failure, or when the stop future resolves. In every
//! case the frame in flight is fully applied and a pending change is
//! flushed before the loop returns.
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use futures_util::future::{select, Either};
use futures_util::pin_mut;
use tracing::{debug, error, info, warn};

use crate::core::ChannelKind;
use crate::infra::codec::engine::decode;
use crate::protocol::layouts::LayoutTable;
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::traits::frame_source::FrameSource;
use crate::telemetry::sink::PersistenceSink;
use crate::telemetry::snapshot::TelemetrySnapshot;

//==================================================================================Enums and Structs
/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Why [`Aggregator::run`] returned.
#[derive(Debug, PartialEq, Eq)]
pub enum StopReason<E> {
    /// The source signalled a clean end of stream.
    EndOfStream,
    /// The stop future resolved.
    Cancelled,
    /// The source failed; the error is handed back to the caller.
    Transport(E),
    /// The loop had already stopped; nothing was received.
    AlreadyStopped,
}

/// Tunables of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorOptions {
    /// Log every channel at `info` after each decoded frame.
    pub log_values: bool,
}

/// Counters maintained by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub frames_received: u64,
    /// Frames that produced at least one update.
    pub frames_decoded: u64,
    /// Unknown identifiers and truncated payloads.
    pub frames_ignored: u64,
    pub persist_calls: u64,
    pub persist_failures: u64,
}

/// Single owner and sole writer of the telemetry snapshot.
pub struct Aggregator {
    table: LayoutTable,
    snapshot: Arc<TelemetrySnapshot>,
    options: AggregatorOptions,
    state: LoopState,
    stats: AggregatorStats,
}

impl Aggregator {
    /// Aggregator with a fresh, empty snapshot.
    pub fn new(table: LayoutTable, options: AggregatorOptions) -> Self {
        Self {
            table,
            snapshot: Arc::new(TelemetrySnapshot::new()),
            options,
            state: LoopState::Running,
            stats: AggregatorStats::default(),
        }
    }

    /// Shared read handle on the snapshot for concurrent readers.
    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    pub fn table(&self) -> &LayoutTable {
        &self.table
    }

    /// Decode one frame, merge it, and persist if the snapshot changed.
    /// Returns the number of channel updates the frame carried.
    pub fn process_frame<P: PersistenceSink>(
        &mut self,
        frame: &RawFrame,
        received_at: SystemTime,
        sink: &mut P,
    ) -> usize {
        self.stats.frames_received += 1;

        let updates = decode(&self.table, frame);
        if updates.is_empty() {
            self.stats.frames_ignored += 1;
            return 0;
        }
        self.stats.frames_decoded += 1;

        for update in &updates {
            debug!(
                id = %frame.id,
                channel = %update.channel,
                value = update.value,
                "decoded field"
            );
        }
        self.snapshot.apply_all(&updates, received_at);

        if self.options.log_values {
            self.log_values();
        }
        self.flush(sink);
        updates.len()
    }

    /// Hand a view to the sink if the snapshot is dirty.
    /// Persistence failures are logged, counted, and otherwise ignored.
    pub fn flush<P: PersistenceSink>(&mut self, sink: &mut P) -> bool {
        if !self.snapshot.take_dirty() {
            return false;
        }
        let view = self.snapshot.read();
        self.stats.persist_calls += 1;
        match sink.persist(&view) {
            Ok(()) => true,
            Err(error) => {
                self.stats.persist_failures += 1;
                error!(%error, "failed to persist telemetry snapshot");
                false
            }
        }
    }

    /// Drive the loop until the source ends, fails, or `stop` resolves.
    ///
    /// `stop` is polled alongside every receive; a frame already received
    /// is always processed to completion before the loop checks it again.
    /// [`LoopState::Stopped`] is terminal: a stopped aggregator returns
    /// [`StopReason::AlreadyStopped`] without touching the source.
    pub async fn run<S, P, F>(
        &mut self,
        source: &mut S,
        sink: &mut P,
        stop: F,
    ) -> StopReason<S::Error>
    where
        S: FrameSource,
        P: PersistenceSink,
        F: Future<Output = ()>,
    {
        if self.state == LoopState::Stopped {
            warn!("aggregator already stopped, not receiving");
            return StopReason::AlreadyStopped;
        }
        info!(layouts = self.table.len(), "aggregator running");

        pin_mut!(stop);
        let reason = loop {
            let received = {
                let recv = source.recv();
                pin_mut!(recv);
                match select(stop.as_mut(), recv).await {
                    Either::Left(((), _)) => break StopReason::Cancelled,
                    Either::Right((received, _)) => received,
                }
            }; // recv borrow is dropped here

            match received {
                Ok(Some(frame)) => {
                    self.process_frame(&frame, SystemTime::now(), sink);
                }
                Ok(None) => break StopReason::EndOfStream,
                Err(error) => {
                    warn!(?error, "frame source failed, stopping");
                    break StopReason::Transport(error);
                }
            }
        };

        if self.flush(sink) {
            info!("flushed pending telemetry before stopping");
        }
        self.state = LoopState::Stopped;
        info!(
            reason = stop_label(&reason),
            frames = self.stats.frames_received,
            persisted = self.stats.persist_calls,
            "aggregator stopped"
        );
        reason
    }

    fn log_values(&self) {
        let view = self.snapshot.read();
        for (channel, sample) in view.iter() {
            match sample {
                Some(sample) => match channel.kind() {
                    ChannelKind::Flag => info!("{channel}: {}", sample.value != 0.0),
                    ChannelKind::Real => {
                        info!("{channel}: {:.2} {}", sample.value, channel.unit())
                    }
                },
                None => info!("{channel}: not received"),
            }
        }
    }
}

fn stop_label<E>(reason: &StopReason<E>) -> &'static str {
    match reason {
        StopReason::EndOfStream => "end of stream",
        StopReason::Cancelled => "cancelled",
        StopReason::Transport(_) => "transport failure",
        StopReason::AlreadyStopped => "already stopped",
    }
}
