//! Latest-value telemetry snapshot shared between the aggregator (sole
//! writer) and any number of readers.
//!
//! Every channel slot holds an optional [`Sample`]: `None` means the channel
//! has not been observed since the snapshot was created. A slot is always
//! replaced as a whole under the write lock, so a reader can never observe
//! a value paired with another update's timestamp.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use crate::core::{Channel, FieldUpdate};

/// Observed value of a channel and the arrival time of the frame carrying it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp: SystemTime,
}

type Slots = [Option<Sample>; Channel::COUNT];

/// Shared mutable record of the latest known value per channel.
#[derive(Debug)]
pub struct TelemetrySnapshot {
    slots: RwLock<Slots>,
    dirty: AtomicBool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySnapshot {
    /// Empty snapshot: every channel invalid, not dirty.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new([None; Channel::COUNT]),
            dirty: AtomicBool::new(false),
        }
    }

    /// Overwrite the entry of `channel`.
    ///
    /// Marks the snapshot dirty when the value differs numerically from the
    /// previous one or when the channel is observed for the first time.
    /// Returns whether it did.
    pub fn apply(&self, channel: Channel, value: f64, timestamp: SystemTime) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let changed = store(&mut slots, channel, value, timestamp);
        if changed {
            // Set under the lock: whoever clears the flag afterwards reads the new value.
            self.dirty.store(true, Ordering::Release);
        }
        changed
    }

    /// Apply every update of one frame under a single lock acquisition, so
    /// readers see either none or all of them.
    pub fn apply_all(&self, updates: &[FieldUpdate], timestamp: SystemTime) -> bool {
        if updates.is_empty() {
            return false;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for update in updates {
            changed |= store(&mut slots, update.channel, update.value, timestamp);
        }
        if changed {
            self.dirty.store(true, Ordering::Release);
        }
        changed
    }

    /// Point-in-time copy of all channels.
    pub fn read(&self) -> SnapshotView {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        SnapshotView { slots: *slots }
    }

    /// Latest sample of a single channel.
    pub fn get(&self, channel: Channel) -> Option<Sample> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots[channel.index()]
    }

    /// Test and clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Peek at the dirty flag without clearing it.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

fn store(slots: &mut Slots, channel: Channel, value: f64, timestamp: SystemTime) -> bool {
    let slot = &mut slots[channel.index()];
    let changed = match slot {
        Some(previous) => previous.value != value,
        None => true,
    };
    *slot = Some(Sample { value, timestamp });
    changed
}

//==================================================================================VIEW
/// Immutable copy of the snapshot handed to readers and persistence sinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotView {
    slots: Slots,
}

impl SnapshotView {
    pub fn get(&self, channel: Channel) -> Option<Sample> {
        self.slots[channel.index()]
    }

    /// Physical value, `None` while the channel is invalid.
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.get(channel).map(|sample| sample.value)
    }

    /// Validity flag of a channel.
    pub fn is_valid(&self, channel: Channel) -> bool {
        self.slots[channel.index()].is_some()
    }

    /// Number of channels observed at least once.
    pub fn valid_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// All channels in persisted column order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, Option<Sample>)> + '_ {
        Channel::ALL
            .iter()
            .map(move |&channel| (channel, self.slots[channel.index()]))
    }
}

#[cfg(test)]
mod tests;
