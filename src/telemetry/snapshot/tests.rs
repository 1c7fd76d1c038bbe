//! Unit tests for snapshot merge and dirty-flag semantics.
use std::sync::Arc;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use super::*;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
/// A fresh snapshot has no valid channel and is clean.
fn test_new_snapshot_is_empty() {
    let snapshot = TelemetrySnapshot::new();
    let view = snapshot.read();
    for channel in Channel::ALL {
        assert!(!view.is_valid(channel));
        assert_eq!(view.value(channel), None);
    }
    assert_eq!(view.valid_count(), 0);
    assert!(!snapshot.take_dirty());
}

#[test]
/// `apply` sets value, timestamp and validity together.
fn test_apply_sets_sample() {
    let snapshot = TelemetrySnapshot::new();
    assert!(snapshot.apply(Channel::EngineSpeed, 3000.0, at(10)));

    let sample = snapshot.get(Channel::EngineSpeed).unwrap();
    assert_eq!(sample.value, 3000.0);
    assert_eq!(sample.timestamp, at(10));
    assert!(snapshot.read().is_valid(Channel::EngineSpeed));
}

#[test]
/// Updates to one channel never touch another.
fn test_disjoint_channels_are_untouched() {
    let snapshot = TelemetrySnapshot::new();
    snapshot.apply(Channel::CoolantTemperature, 90.0, at(1));
    snapshot.apply(Channel::OilTemperature, 110.0, at(2));
    snapshot.apply(Channel::CoolantTemperature, 91.0, at(3));

    let view = snapshot.read();
    assert_eq!(view.value(Channel::CoolantTemperature), Some(91.0));
    assert_eq!(
        view.get(Channel::OilTemperature),
        Some(Sample {
            value: 110.0,
            timestamp: at(2)
        })
    );
    assert_eq!(view.valid_count(), 2);
    assert!(!view.is_valid(Channel::FuelLevel));
}

#[test]
/// Dirty is reported once per change and cleared by `take_dirty`.
fn test_take_dirty_once_per_change() {
    let snapshot = TelemetrySnapshot::new();

    snapshot.apply(Channel::BatteryVoltage, 13.8, at(1));
    assert!(snapshot.is_dirty());
    assert!(snapshot.take_dirty());
    assert!(!snapshot.take_dirty());

    // Same value again: timestamp refreshes, nothing to persist.
    assert!(!snapshot.apply(Channel::BatteryVoltage, 13.8, at(2)));
    assert!(!snapshot.take_dirty());
    assert_eq!(
        snapshot.get(Channel::BatteryVoltage).unwrap().timestamp,
        at(2)
    );

    // Several changes before a flush collapse into one dirty report.
    snapshot.apply(Channel::BatteryVoltage, 13.9, at(3));
    snapshot.apply(Channel::FuelLevel, 12.0, at(3));
    assert!(snapshot.take_dirty());
    assert!(!snapshot.take_dirty());
}

#[test]
/// First observation of a channel is a change even for a zero value.
fn test_first_observation_marks_dirty() {
    let snapshot = TelemetrySnapshot::new();
    assert!(snapshot.apply(Channel::AbsError, 0.0, at(1)));
    assert!(snapshot.take_dirty());
}

#[test]
/// Negative zero compares equal to zero.
fn test_numeric_equality() {
    let snapshot = TelemetrySnapshot::new();
    snapshot.apply(Channel::CoolantPressure, 0.0, at(1));
    snapshot.take_dirty();
    assert!(!snapshot.apply(Channel::CoolantPressure, -0.0, at(2)));
    assert!(!snapshot.take_dirty());
}

#[test]
/// Frame-wide application marks dirty only if something changed.
fn test_apply_all() {
    let snapshot = TelemetrySnapshot::new();
    let updates = [
        FieldUpdate {
            channel: Channel::AbsError,
            value: 1.0,
        },
        FieldUpdate {
            channel: Channel::CheckEngine,
            value: 0.0,
        },
    ];
    assert!(snapshot.apply_all(&updates, at(5)));
    assert!(snapshot.take_dirty());
    assert!(!snapshot.apply_all(&updates, at(6)));
    assert!(!snapshot.take_dirty());
    assert!(!snapshot.apply_all(&[], at(7)));

    let view = snapshot.read();
    assert_eq!(view.get(Channel::CheckEngine).unwrap().timestamp, at(6));
}

#[test]
/// Views iterate in persisted column order.
fn test_view_iter_order() {
    let snapshot = TelemetrySnapshot::new();
    snapshot.apply(Channel::CheckEngine, 1.0, at(1));
    let view = snapshot.read();
    let channels: Vec<Channel> = view.iter().map(|(channel, _)| channel).collect();
    assert_eq!(channels, Channel::ALL.to_vec());
    assert_eq!(view.iter().last().unwrap().1.unwrap().value, 1.0);
}

#[test]
/// A view is a copy: later writes do not alter it.
fn test_view_is_point_in_time() {
    let snapshot = TelemetrySnapshot::new();
    snapshot.apply(Channel::EngineSpeed, 1000.0, at(1));
    let view = snapshot.read();
    snapshot.apply(Channel::EngineSpeed, 2000.0, at(2));
    assert_eq!(view.value(Channel::EngineSpeed), Some(1000.0));
}

#[test]
/// Concurrent readers never see a value paired with another write's timestamp.
fn test_concurrent_reads_are_never_torn() {
    const WRITES: u64 = 20_000;
    let snapshot = Arc::new(TelemetrySnapshot::new());

    let writer = {
        let snapshot = Arc::clone(&snapshot);
        thread::spawn(move || {
            for i in 1..=WRITES {
                snapshot.apply_all(
                    &[
                        FieldUpdate {
                            channel: Channel::EngineSpeed,
                            value: i as f64,
                        },
                        FieldUpdate {
                            channel: Channel::ThrottlePosition,
                            value: i as f64,
                        },
                    ],
                    at(i),
                );
                snapshot.apply(Channel::OilPressure, i as f64, at(i));
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let snapshot = Arc::clone(&snapshot);
            thread::spawn(move || {
                let mut last_seen = 0.0;
                loop {
                    let view = snapshot.read();
                    for (_, sample) in view.iter() {
                        if let Some(sample) = sample {
                            let secs = sample
                                .timestamp
                                .duration_since(UNIX_EPOCH)
                                .unwrap()
                                .as_secs();
                            assert_eq!(sample.value, secs as f64, "torn channel sample");
                        }
                    }
                    // Both channels of one frame move together.
                    assert_eq!(
                        view.value(Channel::EngineSpeed),
                        view.value(Channel::ThrottlePosition)
                    );
                    let speed = view.value(Channel::EngineSpeed).unwrap_or(0.0);
                    assert!(speed >= last_seen, "values went backwards");
                    last_seen = speed;
                    if speed as u64 == WRITES {
                        break;
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
