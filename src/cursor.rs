//! Bounds-checked little-endian reads over an immutable image buffer.

use bytes::Bytes;

use crate::error::{ImageError, Result};

/// Read-only view over the image buffer.
///
/// Integer reads copy the value out; slice reads return a [`Bytes`] that
/// shares the backing allocation, so no payload is ever copied.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a Bytes,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub const fn new(buf: &'a Bytes) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between `offset` and the end of the buffer.
    #[inline]
    pub fn remaining(&self, offset: usize) -> usize {
        self.buf.len().saturating_sub(offset)
    }

    fn range(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => Ok(&self.buf[offset..end]),
            None => Err(ImageError::OutOfBounds {
                offset,
                len,
                size: self.buf.len(),
            }),
        }
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.range(offset, 1)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        let b = self.range(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        let b = self.range(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Zero-copy view of `len` bytes starting at `offset`.
    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<Bytes> {
        self.range(offset, len)?;
        Ok(self.buf.slice(offset..offset + len))
    }
}
