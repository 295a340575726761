use std::collections::HashSet;

use bytes::Bytes;
use tracing::{debug, warn};

use super::records::{
    ApplicationInfo, BootloaderInfo, Certificate, EncryptionDataBlock, EncryptionInit, Header,
    MetadataBlock, ProgramSection, Record, SeUpgrade, Signature, Trailer, VersionDependency,
    decode_record,
};
use super::validator::Validity;
use super::{RECORD_HEADER_SIZE, TagKind};
use crate::crc;
use crate::cursor::ByteCursor;
use crate::error::{ImageError, Result};
use crate::options::{ParseOptions, UnknownTagPolicy};

/// One record as it appeared in the buffer, recognized or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordEntry {
    pub id: u32,
    /// Offset of the 8-byte record header.
    pub offset: usize,
    /// Payload length.
    pub length: usize,
    /// `None` when the id is unknown and the record was skipped.
    pub kind: Option<TagKind>,
}

impl RecordEntry {
    #[inline]
    pub const fn payload_offset(&self) -> usize {
        self.offset + RECORD_HEADER_SIZE
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.payload_offset() + self.length
    }
}

/// Fields collected during the scan. Only turned into an [`Image`] once the
/// whole buffer has been read without a structural error.
#[derive(Debug, Default)]
struct Accumulator {
    header: Option<Header>,
    bootloader: Option<BootloaderInfo>,
    application: Option<ApplicationInfo>,
    metadata: Vec<MetadataBlock>,
    program: Vec<ProgramSection>,
    se_upgrade: Option<SeUpgrade>,
    version_dependency: Option<VersionDependency>,
    encryption_init: Option<EncryptionInit>,
    encryption_data: Vec<EncryptionDataBlock>,
    signature: Option<Signature>,
    certificate: Option<Certificate>,
    trailer: Option<Trailer>,
    records: Vec<RecordEntry>,
}

impl Accumulator {
    /// Singletons are last-write-wins, lists append in encounter order.
    fn store(&mut self, record: Record) {
        match record {
            Record::Header(r) => self.header = Some(r),
            Record::Bootloader(r) => self.bootloader = Some(r),
            Record::Application(r) => self.application = Some(r),
            Record::Metadata(r) => self.metadata.push(r),
            Record::Program(r) => self.program.push(r),
            Record::SeUpgrade(r) => self.se_upgrade = Some(r),
            Record::VersionDependency(r) => self.version_dependency = Some(r),
            Record::EncryptionInit(r) => self.encryption_init = Some(r),
            Record::EncryptionData(r) => self.encryption_data.push(r),
            Record::Signature(r) => self.signature = Some(r),
            Record::Certificate(r) => self.certificate = Some(r),
            Record::End(r) => self.trailer = Some(r),
        }
    }

    fn into_image(self, raw: Bytes) -> Image {
        Image {
            raw,
            header: self.header,
            bootloader: self.bootloader,
            application: self.application,
            metadata: self.metadata,
            program: self.program,
            se_upgrade: self.se_upgrade,
            version_dependency: self.version_dependency,
            encryption_init: self.encryption_init,
            encryption_data: self.encryption_data,
            signature: self.signature,
            certificate: self.certificate,
            trailer: self.trailer,
            records: self.records,
        }
    }
}

/// A structurally well-formed GBL image.
///
/// The image owns its buffer; every byte field of every record is a
/// zero-copy view into it. Integrity is not checked at parse time, see
/// [`Image::validate`].
#[derive(Debug, Clone)]
pub struct Image {
    raw: Bytes,
    header: Option<Header>,
    bootloader: Option<BootloaderInfo>,
    application: Option<ApplicationInfo>,
    metadata: Vec<MetadataBlock>,
    program: Vec<ProgramSection>,
    se_upgrade: Option<SeUpgrade>,
    version_dependency: Option<VersionDependency>,
    encryption_init: Option<EncryptionInit>,
    encryption_data: Vec<EncryptionDataBlock>,
    signature: Option<Signature>,
    certificate: Option<Certificate>,
    trailer: Option<Trailer>,
    records: Vec<RecordEntry>,
}

impl Image {
    /// Parses `buf` with the default (lenient, unbounded) options.
    pub fn parse(buf: impl Into<Bytes>) -> Result<Self> {
        ImageParser::default().parse(buf)
    }

    pub fn parse_with(buf: impl Into<Bytes>, options: ParseOptions) -> Result<Self> {
        ImageParser::new(options).parse(buf)
    }

    /// Full validity verdict: header present with the supported version and
    /// a trailer whose checksum matches the buffer.
    pub fn validate(&self) -> Validity {
        let verdict = Validity::of(self);
        debug!(verdict = verdict.describe(), "validated image");
        verdict
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }

    /// CRC-32 over the whole buffer except its final four bytes.
    #[inline]
    pub fn calculate_crc32(&self) -> u32 {
        crc::image_checksum(&self.raw)
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn bootloader(&self) -> Option<&BootloaderInfo> {
        self.bootloader.as_ref()
    }

    pub fn application(&self) -> Option<&ApplicationInfo> {
        self.application.as_ref()
    }

    pub fn metadata(&self) -> &[MetadataBlock] {
        &self.metadata
    }

    /// Program sections in the order they are to be written.
    pub fn program_sections(&self) -> &[ProgramSection] {
        &self.program
    }

    pub fn se_upgrade(&self) -> Option<&SeUpgrade> {
        self.se_upgrade.as_ref()
    }

    pub fn version_dependency(&self) -> Option<&VersionDependency> {
        self.version_dependency.as_ref()
    }

    pub fn encryption_init(&self) -> Option<&EncryptionInit> {
        self.encryption_init.as_ref()
    }

    pub fn encryption_data(&self) -> &[EncryptionDataBlock] {
        &self.encryption_data
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn trailer(&self) -> Option<&Trailer> {
        self.trailer.as_ref()
    }

    /// Every record in buffer order, skipped ones included.
    pub fn records(&self) -> &[RecordEntry] {
        &self.records
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.is_some_and(|h| h.is_encrypted())
    }

    pub fn is_signed(&self) -> bool {
        self.header.is_some_and(|h| h.is_signed())
    }
}

/// Single forward pass over a buffer of tagged records.
#[derive(Debug, Clone, Default)]
pub struct ImageParser {
    options: ParseOptions,
}

impl ImageParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, buf: impl Into<Bytes>) -> Result<Image> {
        let raw: Bytes = buf.into();

        if let Some(limit) = self.options.max_image_size {
            if raw.len() > limit {
                return Err(ImageError::TooLarge {
                    size: raw.len(),
                    limit,
                });
            }
        }

        let cursor = ByteCursor::new(&raw);
        let mut acc = Accumulator::default();
        let mut pos = 0usize;
        let mut seen_singletons: HashSet<TagKind> = HashSet::new();

        while pos < cursor.len() {
            if let Some(limit) = self.options.max_records {
                if acc.records.len() >= limit {
                    return Err(ImageError::TooManyRecords { limit });
                }
            }

            let entry = self.read_entry(&cursor, pos)?;

            match entry.kind {
                Some(kind) => {
                    let record =
                        decode_record(&cursor, kind, entry.payload_offset(), entry.length)?;
                    debug!(
                        tag = kind.name(),
                        offset = pos,
                        length = entry.length,
                        "decoded record"
                    );
                    if !kind.is_repeatable() && !seen_singletons.insert(kind) {
                        warn!(
                            tag = kind.name(),
                            offset = pos,
                            "duplicate record replaces earlier one"
                        );
                    }
                    acc.store(record);
                }
                None => match self.options.unknown_tags {
                    UnknownTagPolicy::Skip => {
                        warn!(
                            offset = pos,
                            length = entry.length,
                            "skipping unknown tag {:#010X}",
                            entry.id
                        );
                    }
                    UnknownTagPolicy::Reject => {
                        return Err(ImageError::UnknownTag {
                            id: entry.id,
                            offset: pos,
                        });
                    }
                },
            }

            acc.records.push(entry);
            pos = entry.end();
        }

        debug!(
            records = acc.records.len(),
            program_sections = acc.program.len(),
            "parsed image"
        );
        Ok(acc.into_image(raw))
    }

    /// Reads the record header at `pos` and checks the payload fits.
    fn read_entry(&self, cursor: &ByteCursor<'_>, pos: usize) -> Result<RecordEntry> {
        let available = cursor.remaining(pos);
        if available < RECORD_HEADER_SIZE {
            return Err(ImageError::Truncated {
                offset: pos,
                needed: RECORD_HEADER_SIZE,
                available,
            });
        }

        let id = cursor.u32_at(pos)?;
        let length = cursor.u32_at(pos + 4)? as usize;

        let needed = RECORD_HEADER_SIZE.saturating_add(length);
        if available < needed {
            return Err(ImageError::Truncated {
                offset: pos,
                needed,
                available,
            });
        }

        Ok(RecordEntry {
            id,
            offset: pos,
            length,
            kind: TagKind::from_id(id),
        })
    }
}
