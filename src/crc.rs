//! IEEE CRC-32 (reflected, poly 0xEDB88320) over explicit byte ranges.

use std::ops::Range;

/// Width of the checksum stored in the trailer record.
pub const CHECKSUM_SIZE: usize = 4;

#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// CRC over `range` of `data`, clamped to the buffer.
pub fn crc32_range(data: &[u8], range: Range<usize>) -> u32 {
    let end = range.end.min(data.len());
    let start = range.start.min(end);
    crc32(&data[start..end])
}

/// Bytes covered by the trailer checksum: everything but the final
/// [`CHECKSUM_SIZE`] bytes.
#[inline]
pub fn checksummed_range(len: usize) -> Range<usize> {
    0..len.saturating_sub(CHECKSUM_SIZE)
}

/// Checksum the trailer of a `data`-sized image must carry.
pub fn image_checksum(data: &[u8]) -> u32 {
    let value = crc32_range(data, checksummed_range(data.len()));
    tracing::trace!(len = data.len(), "computed image checksum {value:#010X}");
    value
}

#[cfg(test)]
pub(crate) fn crc32_bitwise(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    crc ^ 0xFFFF_FFFF
}
