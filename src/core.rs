//! Defines the "data contract" between the layout table (static configuration)
//! and the decoding engine (the interpreter).
//!
//! Layout descriptors are plain data: the engine walks them to turn a CAN
//! payload into physical values, and the snapshot indexes its storage with
//! the [`Channel`] tag they carry.
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

//==================================================================================CHANNEL
/// One telemetry quantity tracked by the system.
///
/// The declaration order is the documented column order of the persisted
/// record (see [`Channel::ALL`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    EngineSpeed,
    ManifoldPressure,
    ThrottlePosition,
    CoolantPressure,
    FuelPressure,
    OilPressure,
    BatteryVoltage,
    CoolantTemperature,
    AirTemperature,
    FuelTemperature,
    OilTemperature,
    FuelLevel,
    AbsError,
    CheckEngine,
}

/// Numeric domain of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Fixed-point quantity carried as `f64` after scaling.
    Real,
    /// Single status bit, `0.0` or `1.0` once decoded.
    Flag,
}

impl Channel {
    /// Number of channels, used to size per-channel storage.
    pub const COUNT: usize = 14;

    /// Every channel, in persisted column order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::EngineSpeed,
        Channel::ManifoldPressure,
        Channel::ThrottlePosition,
        Channel::CoolantPressure,
        Channel::FuelPressure,
        Channel::OilPressure,
        Channel::BatteryVoltage,
        Channel::CoolantTemperature,
        Channel::AirTemperature,
        Channel::FuelTemperature,
        Channel::OilTemperature,
        Channel::FuelLevel,
        Channel::AbsError,
        Channel::CheckEngine,
    ];

    /// Position of the channel in [`Channel::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Column name used in the persisted record header.
    pub const fn column_name(self) -> &'static str {
        match self {
            Channel::EngineSpeed => "engine_speed_rpm",
            Channel::ManifoldPressure => "manifold_pressure_kpa",
            Channel::ThrottlePosition => "throttle_position_pct",
            Channel::CoolantPressure => "coolant_pressure_kpa",
            Channel::FuelPressure => "fuel_pressure_kpa",
            Channel::OilPressure => "oil_pressure_kpa",
            Channel::BatteryVoltage => "battery_voltage_v",
            Channel::CoolantTemperature => "coolant_temp_celsius",
            Channel::AirTemperature => "air_temp_celsius",
            Channel::FuelTemperature => "fuel_temp_celsius",
            Channel::OilTemperature => "oil_temp_celsius",
            Channel::FuelLevel => "fuel_level_gallons",
            Channel::AbsError => "abs_error",
            Channel::CheckEngine => "check_engine",
        }
    }

    /// Physical unit of the decoded value.
    pub const fn unit(self) -> &'static str {
        match self {
            Channel::EngineSpeed => "rpm",
            Channel::ManifoldPressure
            | Channel::CoolantPressure
            | Channel::FuelPressure
            | Channel::OilPressure => "kPa",
            Channel::ThrottlePosition => "%",
            Channel::BatteryVoltage => "V",
            Channel::CoolantTemperature
            | Channel::AirTemperature
            | Channel::FuelTemperature
            | Channel::OilTemperature => "°C",
            Channel::FuelLevel => "gal",
            Channel::AbsError | Channel::CheckEngine => "",
        }
    }

    pub const fn kind(self) -> ChannelKind {
        match self {
            Channel::AbsError | Channel::CheckEngine => ChannelKind::Flag,
            _ => ChannelKind::Real,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

//==================================================================================DESCRIPTORS
/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    /// Most significant byte first (Motorola).
    Big,
    /// Least significant byte first (Intel).
    Little,
}

/// How the raw integer of a field is pulled out of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldExtract {
    /// Byte-aligned integer of `width` bytes starting at byte `start`.
    Bytes {
        start: u8,
        width: u8,
        endian: Endianness,
        #[serde(default)]
        signed: bool,
    },
    /// Bit-packed unsigned quantity. Bits are numbered LSB-first across the
    /// payload: bit `n` is bit `n % 8` of byte `n / 8`.
    Bits { start_bit: u8, width: u8 },
}

impl FieldExtract {
    /// Number of payload bytes required to read the field.
    pub fn required_len(&self) -> usize {
        match *self {
            FieldExtract::Bytes { start, width, .. } => start as usize + width as usize,
            FieldExtract::Bits { start_bit, width } => {
                (start_bit as usize + width as usize).div_ceil(8)
            }
        }
    }
}

/// Descriptor for a single field of a broadcast frame.
///
/// `physical = raw * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub channel: Channel,
    pub extract: FieldExtract,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl FieldDescriptor {
    /// Big-endian unsigned byte field, the common case of the broadcast protocol.
    pub const fn be_u16(channel: Channel, start: u8, scale: f64, offset: f64) -> Self {
        Self {
            channel,
            extract: FieldExtract::Bytes {
                start,
                width: 2,
                endian: Endianness::Big,
                signed: false,
            },
            scale,
            offset,
        }
    }

    /// Single status bit.
    pub const fn flag(channel: Channel, start_bit: u8) -> Self {
        Self {
            channel,
            extract: FieldExtract::Bits {
                start_bit,
                width: 1,
            },
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Apply the scale/offset transform to a raw integer.
    /// Raw values up to 53 bits convert to `f64` exactly.
    #[inline]
    pub fn to_physical(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

/// Descriptor for an entire broadcast frame: one CAN identifier, its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLayout {
    /// CAN identifier (11-bit standard or 29-bit extended).
    pub id: u32,
    /// Name for diagnostics.
    #[serde(default)]
    pub name: Cow<'static, str>,
    /// Ordered field descriptors.
    pub fields: Cow<'static, [FieldDescriptor]>,
}

impl FrameLayout {
    /// Payload length needed to decode every field of the layout.
    pub fn required_len(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.extract.required_len())
            .max()
            .unwrap_or(0)
    }
}

//==================================================================================UPDATES
/// One decoded (channel, physical value) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldUpdate {
    pub channel: Channel,
    pub value: f64,
}
