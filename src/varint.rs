//! Variable-length integer encoding.
//!
//! Varints are little-endian: each byte carries 7 payload bits, low group first, with
//! the high bit set on every byte except the last. Signed values are zig-zag
//! transformed before encoding so that small negative numbers also stay short.

use bytes::{BufMut, BytesMut};

use crate::{CodecError, Result};

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7f;

/// Maps a signed value onto the unsigned space: `0, -1, 1, -2, 2, ...`.
#[inline]
pub fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Appends an unsigned varint to the buffer.
pub fn write_varuint64(buf: &mut BytesMut, mut value: u64) {
    loop {
        let group = (value & PAYLOAD_MASK as u64) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(group);
            return;
        }
        buf.put_u8(group | CONTINUATION);
    }
}

#[inline]
pub fn write_varuint32(buf: &mut BytesMut, value: u32) {
    write_varuint64(buf, value as u64);
}

#[inline]
pub fn write_varint64(buf: &mut BytesMut, value: i64) {
    write_varuint64(buf, zigzag_encode64(value));
}

#[inline]
pub fn write_varint32(buf: &mut BytesMut, value: i32) {
    write_varuint64(buf, zigzag_encode32(value) as u64);
}

/// Reads an unsigned varint from `input` starting at `*pos`, advancing `*pos`.
///
/// At most ten bytes are consumed; a tenth byte with its continuation bit set (or
/// carrying more than the single bit that fits) is malformed.
pub fn read_varuint64(input: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *input.get(*pos).ok_or(CodecError::InsufficientData)?;
        *pos += 1;
        let group = (byte & PAYLOAD_MASK) as u64;
        if shift == 63 && group > 1 {
            return Err(CodecError::MalformedVarInt);
        }
        value |= group << shift;
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(CodecError::MalformedVarInt);
        }
    }
}

pub fn read_varuint32(input: &[u8], pos: &mut usize) -> Result<u32> {
    let value = read_varuint64(input, pos)?;
    u32::try_from(value).map_err(|_| CodecError::MalformedVarInt)
}
