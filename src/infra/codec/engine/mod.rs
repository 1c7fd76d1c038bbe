//! Generic decoding engine for broadcast frames.
//!
//! The engine interprets the static descriptors of a [`LayoutTable`]: it looks
//! up the layout of the incoming identifier, checks the payload covers the
//! whole layout, then extracts and scales every field. Decoding is total:
//! unknown identifiers and truncated payloads yield an empty result and a
//! frame is never decoded partially.
use tracing::trace;

use crate::core::{Endianness, FieldDescriptor, FieldExtract, FieldUpdate};
use crate::error::BitReaderError;
use crate::infra::codec::bits::BitReader;
use crate::protocol::layouts::LayoutTable;
use crate::protocol::transport::can_frame::RawFrame;

/// Decode a raw frame into the channel updates it carries.
///
/// Returns an empty vector when the identifier has no layout (other
/// devices' traffic on a shared bus), when the frame format (standard or
/// extended) differs from the layout's, or when the payload is shorter
/// than the layout's span.
pub fn decode(table: &LayoutTable, frame: &RawFrame) -> Vec<FieldUpdate> {
    let Some(entry) = table.lookup(frame.id.raw()) else {
        trace!(id = %frame.id, "no layout for identifier, ignoring");
        return Vec::new();
    };

    if !frame.matches_layout_format(entry.layout().id) {
        trace!(
            id = %frame.id,
            extended = frame.extended,
            "frame format does not match the layout, ignoring"
        );
        return Vec::new();
    }

    let payload = frame.payload();
    if payload.len() < entry.required_len() {
        trace!(
            id = %frame.id,
            len = payload.len(),
            required = entry.required_len(),
            "truncated payload, ignoring"
        );
        return Vec::new();
    }

    let mut updates = Vec::with_capacity(entry.layout().fields.len());
    for field in entry.layout().fields.iter() {
        match read_field(payload, field) {
            Ok(raw) => updates.push(FieldUpdate {
                channel: field.channel,
                value: field.to_physical(raw),
            }),
            // Unreachable once the span check passed, but a frame is all or nothing.
            Err(error) => {
                trace!(id = %frame.id, channel = %field.channel, %error, "field extraction failed");
                return Vec::new();
            }
        }
    }
    updates
}

/// Extract the raw integer of a single field according to its descriptor.
fn read_field(payload: &[u8], field: &FieldDescriptor) -> Result<f64, BitReaderError> {
    let mut reader = BitReader::new(payload);
    match field.extract {
        FieldExtract::Bytes {
            start,
            width,
            endian,
            signed,
        } => {
            if !(1..=8).contains(&width) {
                return Err(BitReaderError::TooLongForType {
                    max: 64,
                    asked: width.saturating_mul(8),
                });
            }
            reader.seek(start as usize * 8)?;
            let bytes = reader.read_slice(width as usize)?;
            let raw = assemble(bytes, endian);
            Ok(if signed {
                sign_extend(raw, width as u32 * 8) as f64
            } else {
                raw as f64
            })
        }
        FieldExtract::Bits { start_bit, width } => {
            reader.seek(start_bit as usize)?;
            reader.read_u64(width).map(|raw| raw as f64)
        }
    }
}

/// Fold a byte slice into an integer using the field's byte order.
fn assemble(bytes: &[u8], endian: Endianness) -> u64 {
    match endian {
        Endianness::Big => bytes.iter().fold(0u64, |acc, &byte| (acc << 8) | byte as u64),
        Endianness::Little => bytes.iter().rev().fold(0u64, |acc, &byte| (acc << 8) | byte as u64),
    }
}

/// Reinterpret the low `bits` bits of `raw` as a two's-complement integer.
fn sign_extend(raw: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return raw as i64;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}
