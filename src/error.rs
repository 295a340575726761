use thiserror::Error;

use crate::format::{LengthRule, TagKind};

/// Structural failures that abort a parse.
///
/// Integrity problems (checksum, format version) are not errors; they surface
/// through [`crate::Image::validate`] so the decoded fields stay inspectable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Read of {len} bytes at offset {offset} is out of bounds (size: {size})")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("Truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid {tag} record at offset {offset}: expected {expected} bytes, got {actual}")]
    Format {
        tag: TagKind,
        offset: usize,
        expected: LengthRule,
        actual: usize,
    },

    #[error("Unknown tag {id:#010X} at offset {offset}")]
    UnknownTag { id: u32, offset: usize },

    #[error("Image of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Image holds more than {limit} records")]
    TooManyRecords { limit: usize },
}

impl ImageError {
    /// Byte offset the failure was detected at, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::OutOfBounds { offset, .. }
            | Self::Truncated { offset, .. }
            | Self::Format { offset, .. }
            | Self::UnknownTag { offset, .. } => Some(*offset),
            Self::TooLarge { .. } | Self::TooManyRecords { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
