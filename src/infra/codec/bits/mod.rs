//! Low-level components dedicated to bit manipulation for CAN buffers.
//! The reader serves both byte-aligned fields and bit-packed status
//! quantities of the broadcast frames.
use crate::error::BitReaderError;

/// Generic reader that extracts bit segments from a `&[u8]`
/// without extra allocation or copies.
pub struct BitReader<'a> {
    /// Shared source buffer (typically the received CAN payload).
    buffer: &'a [u8],
    /// Current index expressed as number of bits from the beginning.
    bit_cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    /// Current cursor position in bits.
    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    /// Move the cursor to an absolute bit position.
    /// Positioning exactly at the end of the buffer is allowed.
    pub fn seek(&mut self, bit: usize) -> Result<(), BitReaderError> {
        let buffer_len_bits = self.buffer.len() * 8;
        if bit > buffer_len_bits {
            return Err(BitReaderError::OutOfBounds {
                asked: bit,
                available: buffer_len_bits,
            });
        }
        self.bit_cursor = bit;
        Ok(())
    }

    /// Read `num_bits` bits starting at the current cursor and return a `u64`.
    /// `num_bits` must stay in the [1, 64] range. Bits are consumed LSB-first.
    pub fn read_u64(&mut self, num_bits: u8) -> Result<u64, BitReaderError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitReaderError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }

        let buffer_len_bits = self.buffer.len() * 8;
        let read_end_bit = self.bit_cursor + num_bits as usize;

        // Prevent reading beyond the buffer.
        if read_end_bit > buffer_len_bits {
            return Err(BitReaderError::OutOfBounds {
                asked: num_bits as usize,
                available: buffer_len_bits - self.bit_cursor,
            });
        }

        let mut result: u64 = 0;
        let mut bits_read: usize = 0;

        while bits_read < num_bits as usize {
            let current_byte_index = (self.bit_cursor + bits_read) / 8;
            let current_bit_offset = (self.bit_cursor + bits_read) % 8;
            let byte = self.buffer[current_byte_index];

            // Number of bits available within the current byte.
            let bits_this_iteration = (8 - current_bit_offset).min(num_bits as usize - bits_read);

            let mask = ((1u16 << bits_this_iteration) - 1) as u8;
            let masked_value = (byte >> current_bit_offset) & mask;

            result |= (masked_value as u64) << bits_read;
            bits_read += bits_this_iteration;
        }

        self.bit_cursor = read_end_bit;
        Ok(result)
    }

    /// Return a slice of `len` bytes from the current position.
    /// Cursor must be aligned on an octet boundary.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], BitReaderError> {
        if self.bit_cursor % 8 != 0 {
            return Err(BitReaderError::NonAlignedBit {
                cursor: self.bit_cursor,
            });
        }

        let byte_start = self.bit_cursor / 8;
        let byte_end = byte_start + len;
        if byte_end > self.buffer.len() {
            return Err(BitReaderError::OutOfBounds {
                asked: byte_end,
                available: self.buffer.len(),
            });
        }
        let slice = &self.buffer[byte_start..byte_end];
        self.bit_cursor += len * 8;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests;
