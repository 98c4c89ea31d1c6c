// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Hidden-message frame.
//!
//! ```text
//! [2 bytes] message length (big-endian u16)
//! [N bytes] message
//! [4 bytes] CRC-32 of everything above (big-endian)
//! ```
//!
//! Total frame size = 6 + message length.

/// Bytes of the length prefix.
pub const LEN_BYTES: usize = 2;

/// Length prefix and CRC.
pub const FRAME_OVERHEAD: usize = LEN_BYTES + 4;

/// Bits of the length prefix, read before the rest of the frame.
pub const HEADER_BITS: usize = LEN_BYTES * 8;

/// Build a frame around `message`. The caller guarantees
/// `message.len() <= u16::MAX`.
pub fn build_frame(message: &[u8]) -> Vec<u8> {
    debug_assert!(message.len() <= u16::MAX as usize, "message too long for frame");
    let mut frame = Vec::with_capacity(message.len() + FRAME_OVERHEAD);
    frame.extend_from_slice(&(message.len() as u16).to_be_bytes());
    frame.extend_from_slice(message);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

/// Total frame length for a given length prefix.
pub fn frame_len(header: [u8; LEN_BYTES]) -> usize {
    u16::from_be_bytes(header) as usize + FRAME_OVERHEAD
}

/// Verify the CRC and return the message. `None` on any inconsistency.
pub fn parse_frame(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < FRAME_OVERHEAD {
        return None;
    }
    let total = frame_len([data[0], data[1]]);
    if data.len() < total {
        return None;
    }
    let (body, crc_bytes) = data[..total].split_at(total - 4);
    let stored = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    if stored != crc32fast::hash(body) {
        return None;
    }
    Some(body[LEN_BYTES..].to_vec())
}

/// Convert bytes to bits, MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for bit_pos in (0..8).rev() {
            bits.push((byte >> bit_pos) & 1);
        }
    }
    bits
}

/// Convert bits (MSB first) back to bytes, zero-padding the last byte.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit & 1) << (7 - i)))
        })
        .collect()
}
