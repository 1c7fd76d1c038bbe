//! Test suite for BitReader edge cases.
use super::*;

#[test]
/// Byte-sized reads without offset come back in buffer order.
fn test_read_aligned_bytes() {
    let data = [0x12, 0x34, 0x56, 0x78];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_u64(8).unwrap(), 0x12);
    assert_eq!(reader.read_u64(16).unwrap(), 0x5634);
    assert_eq!(reader.read_u64(8).unwrap(), 0x78);
}

#[test]
/// Read fields spanning two bytes (non-aligned).
fn test_read_non_aligned_bytes() {
    // data: 11100000 00001100
    let data = [0b11100000, 0b00001100];
    let mut reader = BitReader::new(&data);
    reader.read_u64(2).unwrap();
    assert_eq!(reader.read_u64(5).unwrap(), 24);
    assert_eq!(reader.read_u64(5).unwrap(), 25);
}

#[test]
/// Single status bits addressed through `seek`.
fn test_seek_and_read_flag_bits() {
    // byte 7 = 0b1000_0000 -> bit 63 set, bit 62 clear
    let data = [0, 0, 0, 0, 0, 0, 0, 0b1000_0000];
    let mut reader = BitReader::new(&data);

    reader.seek(63).unwrap();
    assert_eq!(reader.read_u64(1).unwrap(), 1);

    reader.seek(62).unwrap();
    assert_eq!(reader.read_u64(1).unwrap(), 0);
    assert_eq!(reader.bit_cursor(), 63);
}

#[test]
/// A nibble in the middle of a byte.
fn test_read_mid_byte_nibble() {
    let data = [0b0101_1010, 0xFF];
    let mut reader = BitReader::new(&data);
    reader.seek(2).unwrap();
    assert_eq!(reader.read_u64(4).unwrap(), 0b0110);
}

#[test]
/// Seeking to the end is allowed, past it is not.
fn test_seek_bounds() {
    let data = [0xAA, 0xBB];
    let mut reader = BitReader::new(&data);
    assert!(reader.seek(16).is_ok());
    assert_eq!(
        reader.seek(17),
        Err(BitReaderError::OutOfBounds {
            asked: 17,
            available: 16
        })
    );
}

#[test]
/// Detects out-of-bounds reads.
fn test_read_out_of_bounds() {
    let data = [0xFF];
    let mut reader = BitReader::new(&data);
    assert!(reader.read_u64(8).is_ok());
    assert_eq!(
        reader.read_u64(1),
        Err(BitReaderError::OutOfBounds {
            asked: 1,
            available: 0
        })
    );
}

#[test]
/// Zero and oversized bit lengths are rejected.
fn test_read_num_bit_limits() {
    let data = [0xFF; 9];
    let mut reader = BitReader::new(&data);
    assert_eq!(
        reader.read_u64(0),
        Err(BitReaderError::TooLongForType { max: 64, asked: 0 })
    );
    assert_eq!(
        reader.read_u64(65),
        Err(BitReaderError::TooLongForType { max: 64, asked: 65 })
    );
}

#[test]
/// Read a full 64-bit block.
fn test_read_max() {
    let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_u64(64).unwrap(), 0x8877665544332211);
}

#[test]
/// Slices require alignment and stay within the buffer.
fn test_read_slice() {
    let data = [1, 2, 3, 4];
    let mut reader = BitReader::new(&data);
    reader.seek(8).unwrap();
    assert_eq!(reader.read_slice(2).unwrap(), &[2, 3]);
    assert_eq!(reader.bit_cursor(), 24);

    assert_eq!(
        reader.read_slice(2),
        Err(BitReaderError::OutOfBounds {
            asked: 5,
            available: 4
        })
    );

    reader.seek(3).unwrap();
    assert_eq!(
        reader.read_slice(1),
        Err(BitReaderError::NonAlignedBit { cursor: 3 })
    );
}
