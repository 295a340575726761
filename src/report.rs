//! Serializable summary of a parsed image for inspection tools.

use serde::Serialize;

use crate::format::{Image, Validity};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeaderReport {
    pub version: u32,
    pub type_flags: u32,
    pub encrypted: bool,
    pub signed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BootloaderReport {
    pub version: String,
    pub address: u32,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApplicationReport {
    pub app_type: u32,
    pub type_names: Vec<&'static str>,
    pub version: u32,
    pub capabilities: u32,
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProgramReport {
    pub flash_start_address: u32,
    pub size: usize,
    pub compression: &'static str,
    pub erase_first: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeUpgradeReport {
    pub blob_size: u32,
    pub version: u32,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionDependencyReport {
    pub image_type: u8,
    pub statement: u8,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EncryptionReport {
    pub message_length: Option<u32>,
    pub nonce: Option<String>,
    pub data_blocks: usize,
    pub data_bytes: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CertificateReport {
    pub struct_version: u8,
    pub flags: String,
    pub key: String,
    pub version: u32,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordReport {
    pub tag: String,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageReport {
    pub size: usize,
    pub valid: bool,
    pub verdict: String,
    pub computed_crc32: String,
    pub header: Option<HeaderReport>,
    pub bootloader: Option<BootloaderReport>,
    pub application: Option<ApplicationReport>,
    pub metadata_sizes: Vec<usize>,
    pub program_sections: Vec<ProgramReport>,
    pub se_upgrade: Option<SeUpgradeReport>,
    pub version_dependency: Option<VersionDependencyReport>,
    pub encryption: Option<EncryptionReport>,
    pub certificate: Option<CertificateReport>,
    pub signature: Option<String>,
    pub records: Vec<RecordReport>,
}

impl ImageReport {
    pub fn new(image: &Image) -> Self {
        let verdict: Validity = image.validate();

        let encrypted = image.encryption_init().is_some() || !image.encryption_data().is_empty();
        let encryption = if encrypted {
            Some(EncryptionReport {
                message_length: image.encryption_init().map(|e| e.message_length),
                nonce: image.encryption_init().map(|e| hex::encode(&e.nonce)),
                data_blocks: image.encryption_data().len(),
                data_bytes: image.encryption_data().iter().map(|b| b.data.len()).sum(),
            })
        } else {
            None
        };

        Self {
            size: image.len(),
            valid: verdict.is_valid(),
            verdict: verdict.to_string(),
            computed_crc32: format!("{:#010X}", image.calculate_crc32()),
            header: image.header().map(|h| HeaderReport {
                version: h.version,
                type_flags: h.type_flags,
                encrypted: h.is_encrypted(),
                signed: h.is_signed(),
            }),
            bootloader: image.bootloader().map(|b| BootloaderReport {
                version: b.version.to_string(),
                address: b.address,
                size: b.data.len(),
            }),
            application: image.application().map(|a| ApplicationReport {
                app_type: a.app_type,
                type_names: a.type_names(),
                version: a.version,
                capabilities: a.capabilities,
                product_id: hex::encode(&a.product_id),
            }),
            metadata_sizes: image.metadata().iter().map(|m| m.data.len()).collect(),
            program_sections: image
                .program_sections()
                .iter()
                .map(|p| ProgramReport {
                    flash_start_address: p.flash_start_address,
                    size: p.data.len(),
                    compression: p.compression.name(),
                    erase_first: p.erase_first,
                })
                .collect(),
            se_upgrade: image.se_upgrade().map(|s| SeUpgradeReport {
                blob_size: s.blob_size,
                version: s.version,
                size: s.data.len(),
            }),
            version_dependency: image.version_dependency().map(|d| VersionDependencyReport {
                image_type: d.image_type,
                statement: d.statement,
                version: d.version,
            }),
            encryption,
            certificate: image.certificate().map(|c| CertificateReport {
                struct_version: c.struct_version,
                flags: hex::encode(&c.flags),
                key: hex::encode(&c.key),
                version: c.version,
                signature: hex::encode(&c.signature),
            }),
            signature: image
                .signature()
                .map(|s| format!("{}{}", hex::encode(&s.r), hex::encode(&s.s))),
            records: image
                .records()
                .iter()
                .map(|r| RecordReport {
                    tag: match r.kind {
                        Some(kind) => kind.name().to_string(),
                        None => format!("unknown({:#010X})", r.id),
                    },
                    offset: r.offset,
                    length: r.length,
                })
                .collect(),
        }
    }
}
