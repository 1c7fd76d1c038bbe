//! CAN identifiers as seen by the decoder: 11-bit standard or 29-bit
//! extended, stored in a `u32`.
use core::fmt;

use embedded_can::Id;

/// Largest 11-bit identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Largest 29-bit identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

//==================================================================================CAN_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Raw CAN identifier. Layout lookup is keyed by this value.
pub struct CanId(pub u32);

impl CanId {
    /// Raw numeric value.
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// True when the value fits an 11-bit standard identifier.
    pub fn is_standard(&self) -> bool {
        self.0 <= MAX_STANDARD_ID
    }

    /// True when the value fits in 29 bits.
    pub fn is_valid(&self) -> bool {
        self.0 <= MAX_EXTENDED_ID
    }

    /// Acceptance mask matching exactly this identifier.
    pub fn exact_mask(&self) -> u32 {
        if self.is_standard() {
            MAX_STANDARD_ID
        } else {
            MAX_EXTENDED_ID
        }
    }
}

impl From<Id> for CanId {
    fn from(id: Id) -> Self {
        match id {
            Id::Standard(standard) => CanId(standard.as_raw() as u32),
            Id::Extended(extended) => CanId(extended.as_raw()),
        }
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05X}", self.0)
    }
}
