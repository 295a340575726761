pub mod crc;
pub mod cursor;
mod error;
pub mod format;
pub mod options;
pub mod report;

pub use error::{ImageError, Result};
pub use format::{
    Compression, Image, ImageParser, LengthRule, ProgramSection, RecordEntry, SUPPORTED_VERSION,
    TagKind, Validity,
};
pub use options::{ParseOptions, UnknownTagPolicy};
pub use report::ImageReport;
