//! Frame layout table: the static configuration mapping each broadcast
//! identifier to its field descriptors.
//!
//! The table is validated once at construction and immutable afterwards.
//! Entries are kept sorted by identifier so lookups are a binary search.
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{Channel, FieldDescriptor, FieldExtract, FrameLayout};
use crate::error::LayoutError;
use crate::protocol::transport::can_frame::MAX_PAYLOAD;
use crate::protocol::transport::can_id::CanId;

//==================================================================================BUILTIN
/// Broadcast frames emitted by the engine ECU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastFrame {
    /// Engine speed, manifold pressure, throttle position, coolant pressure.
    EngineCore,
    /// Fuel and oil pressure.
    Pressures,
    /// Battery voltage.
    Electrical,
    /// Coolant, air, fuel, and oil temperature.
    Temperatures,
    /// Fuel level.
    FuelLevel,
    /// ABS and check-engine status bits.
    Status,
}

const ENGINE_CORE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::be_u16(Channel::EngineSpeed, 0, 1.0, 0.0),
    FieldDescriptor::be_u16(Channel::ManifoldPressure, 2, 0.1, 0.0),
    FieldDescriptor::be_u16(Channel::ThrottlePosition, 4, 0.1, 0.0),
    FieldDescriptor::be_u16(Channel::CoolantPressure, 6, 0.1, GAUGE_OFFSET_KPA),
];

const PRESSURES_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::be_u16(Channel::FuelPressure, 0, 0.1, GAUGE_OFFSET_KPA),
    FieldDescriptor::be_u16(Channel::OilPressure, 2, 0.1, GAUGE_OFFSET_KPA),
];

const ELECTRICAL_FIELDS: &[FieldDescriptor] =
    &[FieldDescriptor::be_u16(Channel::BatteryVoltage, 0, 0.1, 0.0)];

const TEMPERATURES_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::be_u16(Channel::CoolantTemperature, 0, 0.1, KELVIN_OFFSET),
    FieldDescriptor::be_u16(Channel::AirTemperature, 2, 0.1, KELVIN_OFFSET),
    FieldDescriptor::be_u16(Channel::FuelTemperature, 4, 0.1, KELVIN_OFFSET),
    FieldDescriptor::be_u16(Channel::OilTemperature, 6, 0.1, KELVIN_OFFSET),
];

// 0.1 L per bit, reported in US gallons.
const FUEL_LEVEL_FIELDS: &[FieldDescriptor] = &[FieldDescriptor::be_u16(
    Channel::FuelLevel,
    0,
    0.1 * LITERS_TO_GALLONS,
    0.0,
)];

// Byte 7: bit 7 ABS error, bit 6 check engine.
const STATUS_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::flag(Channel::AbsError, 63),
    FieldDescriptor::flag(Channel::CheckEngine, 62),
];

/// Kelvin to Celsius.
pub const KELVIN_OFFSET: f64 = -273.15;
/// Absolute to gauge pressure (one standard atmosphere).
pub const GAUGE_OFFSET_KPA: f64 = -101.3;
/// 1 L = 0.264172 US gal.
pub const LITERS_TO_GALLONS: f64 = 0.264172;
/// Widest raw integer converted to `f64` without rounding.
pub const MAX_EXACT_BITS: u32 = f64::MANTISSA_DIGITS;

impl BroadcastFrame {
    pub const ALL: [BroadcastFrame; 6] = [
        BroadcastFrame::EngineCore,
        BroadcastFrame::Pressures,
        BroadcastFrame::Electrical,
        BroadcastFrame::Temperatures,
        BroadcastFrame::FuelLevel,
        BroadcastFrame::Status,
    ];

    /// CAN identifier of the frame.
    pub const fn id(self) -> u32 {
        match self {
            BroadcastFrame::EngineCore => 0x360,
            BroadcastFrame::Pressures => 0x361,
            BroadcastFrame::Electrical => 0x372,
            BroadcastFrame::Temperatures => 0x3E0,
            BroadcastFrame::FuelLevel => 0x3E2,
            BroadcastFrame::Status => 0x3E4,
        }
    }

    /// Reverse lookup from a raw identifier.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|frame| frame.id() == id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            BroadcastFrame::EngineCore => "engine_core",
            BroadcastFrame::Pressures => "pressures",
            BroadcastFrame::Electrical => "electrical",
            BroadcastFrame::Temperatures => "temperatures",
            BroadcastFrame::FuelLevel => "fuel_level",
            BroadcastFrame::Status => "status",
        }
    }

    pub const fn fields(self) -> &'static [FieldDescriptor] {
        match self {
            BroadcastFrame::EngineCore => ENGINE_CORE_FIELDS,
            BroadcastFrame::Pressures => PRESSURES_FIELDS,
            BroadcastFrame::Electrical => ELECTRICAL_FIELDS,
            BroadcastFrame::Temperatures => TEMPERATURES_FIELDS,
            BroadcastFrame::FuelLevel => FUEL_LEVEL_FIELDS,
            BroadcastFrame::Status => STATUS_FIELDS,
        }
    }

    /// Static layout descriptor of the frame.
    pub const fn layout(self) -> FrameLayout {
        FrameLayout {
            id: self.id(),
            name: Cow::Borrowed(self.name()),
            fields: Cow::Borrowed(self.fields()),
        }
    }
}

//==================================================================================MANIFEST
/// On-disk layout manifest: `{ "frames": [ ... ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutManifest {
    pub frames: Vec<FrameLayout>,
}

//==================================================================================TABLE
/// Validated layout with its precomputed payload span.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    layout: FrameLayout,
    required_len: usize,
}

impl LayoutEntry {
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Minimum payload length for the frame to be decoded.
    pub fn required_len(&self) -> usize {
        self.required_len
    }
}

/// Immutable identifier → layout mapping.
#[derive(Debug, Clone)]
pub struct LayoutTable {
    entries: Vec<LayoutEntry>,
}

impl LayoutTable {
    /// Validate the layouts and build the table.
    ///
    /// Rejects out-of-range identifiers, duplicate identifiers, empty
    /// layouts, fields reaching past the classic 8-byte payload, fields
    /// wider than [`MAX_EXACT_BITS`], non-finite scale or offset, and any
    /// channel defined more than once.
    pub fn new(layouts: Vec<FrameLayout>) -> Result<Self, LayoutError> {
        let mut owners: HashMap<Channel, u32> = HashMap::new();
        let mut entries = Vec::with_capacity(layouts.len());

        for layout in layouts {
            let id = layout.id;
            if !CanId(id).is_valid() {
                return Err(LayoutError::InvalidIdentifier { id });
            }
            if layout.fields.is_empty() {
                return Err(LayoutError::EmptyLayout { id });
            }
            for field in layout.fields.iter() {
                validate_field(id, field)?;
                if let Some(first) = owners.insert(field.channel, id) {
                    return Err(LayoutError::DuplicateChannel {
                        channel: field.channel,
                        first,
                        second: id,
                    });
                }
            }
            let required_len = layout.required_len();
            entries.push(LayoutEntry {
                layout,
                required_len,
            });
        }

        entries.sort_by_key(|entry| entry.layout.id);
        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].layout.id == pair[1].layout.id)
        {
            return Err(LayoutError::DuplicateIdentifier {
                id: pair[0].layout.id,
            });
        }

        Ok(Self { entries })
    }

    /// The engine ECU broadcast table.
    pub fn builtin() -> Self {
        let entries = BroadcastFrame::ALL
            .into_iter()
            .map(|frame| {
                let layout = frame.layout();
                let required_len = layout.required_len();
                LayoutEntry {
                    layout,
                    required_len,
                }
            })
            .collect();
        // BroadcastFrame::ALL is in ascending identifier order.
        Self { entries }
    }

    /// Parse and validate a JSON manifest.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, LayoutError> {
        let manifest: LayoutManifest = serde_json::from_reader(reader)?;
        Self::new(manifest.frames)
    }

    /// Load the layout table used at startup.
    ///
    /// Priority order:
    ///   1. `path`, when provided and present on disk
    ///   2. the built-in broadcast table
    ///
    /// A path that does not exist falls back to the built-in table with a
    /// warning; a manifest that exists but is invalid is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, LayoutError> {
        let Some(path) = path else {
            info!("using built-in broadcast layout table");
            return Ok(Self::builtin());
        };

        if !path.exists() {
            warn!(
                path = %path.display(),
                "layout manifest not found, falling back to the built-in table"
            );
            return Ok(Self::builtin());
        }

        let file = std::fs::File::open(path).map_err(|source| LayoutError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_reader(std::io::BufReader::new(file))?;
        info!(path = %path.display(), frames = table.len(), "loaded layout manifest");
        Ok(table)
    }

    /// Layout registered for `id`, if any.
    pub fn lookup(&self, id: u32) -> Option<&LayoutEntry> {
        self.entries
            .binary_search_by_key(&id, |entry| entry.layout.id)
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Every identifier of the table, ascending. Used for acceptance filters.
    pub fn identifiers(&self) -> impl Iterator<Item = CanId> + '_ {
        self.entries.iter().map(|entry| CanId(entry.layout.id))
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_field(id: u32, field: &FieldDescriptor) -> Result<(), LayoutError> {
    let in_bounds = match field.extract {
        FieldExtract::Bytes { start, width, .. } => {
            (1..=8).contains(&width) && start as usize + width as usize <= MAX_PAYLOAD
        }
        FieldExtract::Bits { start_bit, width } => {
            (1..=64).contains(&width) && start_bit as usize + width as usize <= MAX_PAYLOAD * 8
        }
    };
    if !in_bounds {
        return Err(LayoutError::FieldOutOfBounds {
            id,
            channel: field.channel,
        });
    }
    let bits = match field.extract {
        FieldExtract::Bytes { width, .. } => width as u32 * 8,
        FieldExtract::Bits { width, .. } => width as u32,
    };
    if bits > MAX_EXACT_BITS {
        return Err(LayoutError::FieldTooWide {
            id,
            channel: field.channel,
            bits,
            max: MAX_EXACT_BITS,
        });
    }
    if !field.scale.is_finite() || !field.offset.is_finite() {
        return Err(LayoutError::InvalidScale {
            id,
            channel: field.channel,
        });
    }
    Ok(())
}
