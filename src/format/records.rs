use bytes::Bytes;

use super::{
    ECDSA_COORDINATE_SIZE, ECDSA_KEY_SIZE, LengthRule, NONCE_SIZE, PRODUCT_ID_SIZE,
    TYPE_ENCRYPTION_AES_CCM, TYPE_SIGNATURE_ECDSA_P256, TagKind, application_type_names,
};
use crate::cursor::ByteCursor;
use crate::error::{ImageError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub type_flags: u32,
}

impl Header {
    #[inline]
    pub const fn is_encrypted(&self) -> bool {
        self.type_flags & TYPE_ENCRYPTION_AES_CCM != 0
    }

    #[inline]
    pub const fn is_signed(&self) -> bool {
        self.type_flags & TYPE_SIGNATURE_ECDSA_P256 != 0
    }
}

/// Packed `major << 24 | minor << 16 | customer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootloaderVersion(pub u32);

impl BootloaderVersion {
    #[inline]
    pub const fn major(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn minor(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn customer(self) -> u16 {
        self.0 as u16
    }
}

impl std::fmt::Display for BootloaderVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.customer())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootloaderInfo {
    pub version: BootloaderVersion,
    pub address: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub app_type: u32,
    pub version: u32,
    pub capabilities: u32,
    /// Always [`PRODUCT_ID_SIZE`] bytes.
    pub product_id: Bytes,
}

impl ApplicationInfo {
    pub fn type_names(&self) -> Vec<&'static str> {
        application_type_names(self.app_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
    Lzma,
}

impl Compression {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Lzma => "lzma",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSection {
    pub flash_start_address: u32,
    pub data: Bytes,
    pub compression: Compression,
    /// Set for the erase-then-program tag.
    pub erase_first: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeUpgrade {
    pub blob_size: u32,
    pub version: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDependency {
    pub image_type: u8,
    pub statement: u8,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInit {
    pub message_length: u32,
    /// Always [`NONCE_SIZE`] bytes.
    pub nonce: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionDataBlock {
    pub data: Bytes,
}

/// ECDSA P-256 signature, each coordinate 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: Bytes,
    pub s: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub struct_version: u8,
    /// Always 3 bytes.
    pub flags: Bytes,
    /// Uncompressed P-256 public key, 64 bytes.
    pub key: Bytes,
    pub version: u32,
    pub signature: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub checksum: u32,
}

/// A decoded record, one variant per record family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header(Header),
    Bootloader(BootloaderInfo),
    Application(ApplicationInfo),
    Metadata(MetadataBlock),
    Program(ProgramSection),
    SeUpgrade(SeUpgrade),
    VersionDependency(VersionDependency),
    EncryptionInit(EncryptionInit),
    EncryptionData(EncryptionDataBlock),
    Certificate(Certificate),
    Signature(Signature),
    End(Trailer),
}

/// Payload location inside the image buffer. Length is already bounds checked.
#[derive(Debug, Clone, Copy)]
struct Payload {
    offset: usize,
    len: usize,
}

type Decoder = fn(&ByteCursor<'_>, Payload) -> Result<Record>;

/// Decoder for each tag. The match is exhaustive, so a new [`TagKind`]
/// cannot be added without one.
const fn decoder(kind: TagKind) -> Decoder {
    match kind {
        TagKind::Header => decode_header,
        TagKind::Bootloader => decode_bootloader,
        TagKind::Application => decode_application,
        TagKind::Metadata => decode_metadata,
        TagKind::Program => decode_program,
        TagKind::EraseProgram => decode_erase_program,
        TagKind::ProgramLz4 => decode_program_lz4,
        TagKind::ProgramLzma => decode_program_lzma,
        TagKind::End => decode_end,
        TagKind::SeUpgrade => decode_se_upgrade,
        TagKind::VersionDependency => decode_version_dependency,
        TagKind::EncryptionInit => decode_encryption_init,
        TagKind::EncryptionData => decode_encryption_data,
        TagKind::Certificate => decode_certificate,
        TagKind::Signature => decode_signature,
    }
}

/// Decodes the payload of a `kind` record located at `offset..offset + len`.
///
/// The payload length is checked against the tag's [`LengthRule`] first; a
/// mismatch fails with [`ImageError::Format`]. Byte fields of the returned
/// record are views into `cursor`'s buffer.
pub fn decode_record(
    cursor: &ByteCursor<'_>,
    kind: TagKind,
    offset: usize,
    len: usize,
) -> Result<Record> {
    if cursor.remaining(offset) < len {
        return Err(ImageError::OutOfBounds {
            offset,
            len,
            size: cursor.len(),
        });
    }

    let rule: LengthRule = kind.length_rule();
    if !rule.accepts(len) {
        return Err(ImageError::Format {
            tag: kind,
            offset,
            expected: rule,
            actual: len,
        });
    }

    decoder(kind)(cursor, Payload { offset, len })
}

fn decode_header(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::Header(Header {
        version: c.u32_at(p.offset)?,
        type_flags: c.u32_at(p.offset + 4)?,
    }))
}

fn decode_bootloader(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::Bootloader(BootloaderInfo {
        version: BootloaderVersion(c.u32_at(p.offset)?),
        address: c.u32_at(p.offset + 4)?,
        data: c.bytes_at(p.offset + 8, p.len - 8)?,
    }))
}

fn decode_application(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::Application(ApplicationInfo {
        app_type: c.u32_at(p.offset)?,
        version: c.u32_at(p.offset + 4)?,
        capabilities: c.u32_at(p.offset + 8)?,
        product_id: c.bytes_at(p.offset + 12, PRODUCT_ID_SIZE)?,
    }))
}

fn decode_metadata(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::Metadata(MetadataBlock {
        data: c.bytes_at(p.offset, p.len)?,
    }))
}

fn program(
    c: &ByteCursor<'_>,
    p: Payload,
    compression: Compression,
    erase_first: bool,
) -> Result<Record> {
    Ok(Record::Program(ProgramSection {
        flash_start_address: c.u32_at(p.offset)?,
        data: c.bytes_at(p.offset + 4, p.len - 4)?,
        compression,
        erase_first,
    }))
}

fn decode_program(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    program(c, p, Compression::None, false)
}

fn decode_erase_program(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    program(c, p, Compression::None, true)
}

fn decode_program_lz4(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    program(c, p, Compression::Lz4, false)
}

fn decode_program_lzma(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    program(c, p, Compression::Lzma, false)
}

fn decode_end(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::End(Trailer {
        checksum: c.u32_at(p.offset)?,
    }))
}

fn decode_se_upgrade(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::SeUpgrade(SeUpgrade {
        blob_size: c.u32_at(p.offset)?,
        version: c.u32_at(p.offset + 4)?,
        data: c.bytes_at(p.offset + 8, p.len - 8)?,
    }))
}

fn decode_version_dependency(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    // bytes 2..4 are reserved
    Ok(Record::VersionDependency(VersionDependency {
        image_type: c.u8_at(p.offset)?,
        statement: c.u8_at(p.offset + 1)?,
        version: c.u32_at(p.offset + 4)?,
    }))
}

fn decode_encryption_init(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::EncryptionInit(EncryptionInit {
        message_length: c.u32_at(p.offset)?,
        nonce: c.bytes_at(p.offset + 4, NONCE_SIZE)?,
    }))
}

fn decode_encryption_data(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::EncryptionData(EncryptionDataBlock {
        data: c.bytes_at(p.offset, p.len)?,
    }))
}

fn decode_certificate(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    let key_at = p.offset + 4;
    let version_at = key_at + ECDSA_KEY_SIZE;
    Ok(Record::Certificate(Certificate {
        struct_version: c.u8_at(p.offset)?,
        flags: c.bytes_at(p.offset + 1, 3)?,
        key: c.bytes_at(key_at, ECDSA_KEY_SIZE)?,
        version: c.u32_at(version_at)?,
        signature: c.bytes_at(version_at + 4, ECDSA_KEY_SIZE)?,
    }))
}

fn decode_signature(c: &ByteCursor<'_>, p: Payload) -> Result<Record> {
    Ok(Record::Signature(Signature {
        r: c.bytes_at(p.offset, ECDSA_COORDINATE_SIZE)?,
        s: c.bytes_at(p.offset + ECDSA_COORDINATE_SIZE, ECDSA_COORDINATE_SIZE)?,
    }))
}
