use std::fmt;

use super::SUPPORTED_VERSION;
use super::parser::Image;

/// Integrity verdict for a structurally sound image.
///
/// Checks run in declaration order and the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    MissingHeader,
    UnsupportedVersion { found: u32 },
    MissingTrailer,
    ChecksumMismatch { stored: u32, computed: u32 },
}

impl Validity {
    pub fn of(image: &Image) -> Self {
        let Some(header) = image.header() else {
            return Self::MissingHeader;
        };
        if header.version != SUPPORTED_VERSION {
            return Self::UnsupportedVersion {
                found: header.version,
            };
        }

        let Some(trailer) = image.trailer() else {
            return Self::MissingTrailer;
        };
        let computed = image.calculate_crc32();
        if trailer.checksum != computed {
            return Self::ChecksumMismatch {
                stored: trailer.checksum,
                computed,
            };
        }

        Self::Valid
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::MissingHeader => "no header record",
            Self::UnsupportedVersion { .. } => "unsupported format version",
            Self::MissingTrailer => "no end record",
            Self::ChecksumMismatch { .. } => "checksum mismatch",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found } => {
                write!(f, "{} {found:#010X} (expected {SUPPORTED_VERSION:#010X})", self.describe())
            }
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "{}: stored {stored:#010X}, computed {computed:#010X}",
                self.describe()
            ),
            _ => f.write_str(self.describe()),
        }
    }
}
