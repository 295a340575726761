//! GBL container layout: tag registry, record decoders, parser and validator.

mod parser;
mod records;
mod validator;

use std::fmt;

pub use parser::{Image, ImageParser, RecordEntry};
pub use records::{
    ApplicationInfo, BootloaderInfo, BootloaderVersion, Certificate, Compression,
    EncryptionDataBlock, EncryptionInit, Header, MetadataBlock, ProgramSection, Record, SeUpgrade,
    Signature, Trailer, VersionDependency, decode_record,
};
pub use validator::Validity;

/// The one header format version this parser accepts as valid.
pub const SUPPORTED_VERSION: u32 = 0x0300_0000;

/// Every record starts with a tag id and a payload length, both u32 LE.
pub const RECORD_HEADER_SIZE: usize = 8;

pub const HEADER_SIZE: usize = 8;
pub const BOOTLOADER_PREFIX_SIZE: usize = 8;
pub const APPLICATION_SIZE: usize = 28;
pub const PROGRAM_PREFIX_SIZE: usize = 4;
pub const SE_UPGRADE_PREFIX_SIZE: usize = 8;
pub const VERSION_DEPENDENCY_SIZE: usize = 8;
pub const ENCRYPTION_INIT_SIZE: usize = 16;
pub const SIGNATURE_SIZE: usize = 64;
pub const CERTIFICATE_SIZE: usize = 136;
pub const TRAILER_SIZE: usize = 4;

pub const PRODUCT_ID_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const ECDSA_COORDINATE_SIZE: usize = 32;
pub const ECDSA_KEY_SIZE: usize = 64;

pub const TYPE_ENCRYPTION_AES_CCM: u32 = 0x0000_0001;
pub const TYPE_SIGNATURE_ECDSA_P256: u32 = 0x0000_0100;

/// Application type bits carried in [`ApplicationInfo::app_type`].
pub const APPLICATION_TYPES: [(u32, &str); 8] = [
    (1 << 0, "zigbee"),
    (1 << 1, "thread"),
    (1 << 2, "flex"),
    (1 << 3, "bluetooth"),
    (1 << 4, "mcu"),
    (1 << 5, "bluetooth-app"),
    (1 << 6, "bootloader"),
    (1 << 7, "z-wave"),
];

/// Known record tags. The discriminant is the on-wire tag id.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Header = 0x03A6_17EB,
    Bootloader = 0xF509_09F5,
    Application = 0xF40A_0AF4,
    Metadata = 0xF608_08F6,
    Program = 0xFE01_01FE,
    EraseProgram = 0xFD03_03FD,
    ProgramLz4 = 0xFD05_05FD,
    ProgramLzma = 0xFD07_07FD,
    End = 0xFC04_04FC,
    SeUpgrade = 0x5EA6_17EB,
    VersionDependency = 0x76A6_17EB,
    EncryptionInit = 0xFA06_06FA,
    EncryptionData = 0xF907_07F9,
    Certificate = 0xF30B_0BF3,
    Signature = 0xF70A_0AF7,
}

impl TagKind {
    pub const ALL: [TagKind; 15] = [
        Self::Header,
        Self::Bootloader,
        Self::Application,
        Self::Metadata,
        Self::Program,
        Self::EraseProgram,
        Self::ProgramLz4,
        Self::ProgramLzma,
        Self::End,
        Self::SeUpgrade,
        Self::VersionDependency,
        Self::EncryptionInit,
        Self::EncryptionData,
        Self::Certificate,
        Self::Signature,
    ];

    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Bootloader => "bootloader",
            Self::Application => "application",
            Self::Metadata => "metadata",
            Self::Program => "program",
            Self::EraseProgram => "erase-program",
            Self::ProgramLz4 => "program-lz4",
            Self::ProgramLzma => "program-lzma",
            Self::End => "end",
            Self::SeUpgrade => "se-upgrade",
            Self::VersionDependency => "version-dependency",
            Self::EncryptionInit => "encryption-init",
            Self::EncryptionData => "encryption-data",
            Self::Certificate => "certificate",
            Self::Signature => "signature",
        }
    }

    /// Payload length contract for this tag.
    #[must_use]
    pub const fn length_rule(self) -> LengthRule {
        match self {
            Self::Header => LengthRule::Exact(HEADER_SIZE),
            Self::Bootloader => LengthRule::AtLeast(BOOTLOADER_PREFIX_SIZE),
            Self::Application => LengthRule::Exact(APPLICATION_SIZE),
            Self::Metadata | Self::EncryptionData => LengthRule::AtLeast(0),
            Self::Program | Self::EraseProgram | Self::ProgramLz4 | Self::ProgramLzma => {
                LengthRule::AtLeast(PROGRAM_PREFIX_SIZE)
            }
            Self::End => LengthRule::Exact(TRAILER_SIZE),
            Self::SeUpgrade => LengthRule::AtLeast(SE_UPGRADE_PREFIX_SIZE),
            Self::VersionDependency => LengthRule::Exact(VERSION_DEPENDENCY_SIZE),
            Self::EncryptionInit => LengthRule::Exact(ENCRYPTION_INIT_SIZE),
            Self::Certificate => LengthRule::Exact(CERTIFICATE_SIZE),
            Self::Signature => LengthRule::Exact(SIGNATURE_SIZE),
        }
    }

    /// Tags that may appear any number of times, in meaningful order.
    #[must_use]
    pub const fn is_repeatable(self) -> bool {
        matches!(
            self,
            Self::Metadata
                | Self::Program
                | Self::EraseProgram
                | Self::ProgramLz4
                | Self::ProgramLzma
                | Self::EncryptionData
        )
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Exact(usize),
    AtLeast(usize),
}

impl LengthRule {
    #[inline]
    pub const fn accepts(self, len: usize) -> bool {
        match self {
            Self::Exact(n) => len == n,
            Self::AtLeast(n) => len >= n,
        }
    }
}

impl fmt::Display for LengthRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Names of the known bits set in an application type field.
pub fn application_type_names(app_type: u32) -> Vec<&'static str> {
    APPLICATION_TYPES
        .iter()
        .filter(|(bit, _)| app_type & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}
