use gbl_image::crc::crc32;
use gbl_image::format::{APPLICATION_SIZE, CERTIFICATE_SIZE};
use gbl_image::{Compression, Image, ImageError, SUPPORTED_VERSION, TagKind, Validity};

fn make_record(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&id.to_le_bytes());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(payload);
    record
}

fn make_header(version: u32, flags: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&version.to_le_bytes());
    payload.extend_from_slice(&flags.to_le_bytes());
    make_record(TagKind::Header.id(), &payload)
}

fn make_program(kind: TagKind, address: u32, data: &[u8]) -> Vec<u8> {
    let mut payload = address.to_le_bytes().to_vec();
    payload.extend_from_slice(data);
    make_record(kind.id(), &payload)
}

fn make_application() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(1u32 << 4).to_le_bytes());
    payload.extend_from_slice(&0x0001_0002u32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(b"0123456789abcdef");
    assert_eq!(payload.len(), APPLICATION_SIZE);
    make_record(TagKind::Application.id(), &payload)
}

fn append_trailer(data: &mut Vec<u8>) {
    data.extend_from_slice(&TagKind::End.id().to_le_bytes());
    data.extend_from_slice(&4u32.to_le_bytes());
    let checksum = crc32(data);
    data.extend_from_slice(&checksum.to_le_bytes());
}

fn make_scenario_image() -> Vec<u8> {
    let mut data = make_header(0x0300_0000, 0);
    data.extend(make_program(TagKind::Program, 0, &[0xDE, 0xAD, 0xBE, 0xEF]));
    append_trailer(&mut data);
    data
}

#[test]
fn test_scenario_image_is_valid() {
    let image = Image::parse(make_scenario_image()).unwrap();

    let prog = image.program_sections();
    assert_eq!(prog.len(), 1);
    assert_eq!(&prog[0].data[..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(prog[0].flash_start_address, 0);
    assert!(image.is_valid());
    assert_eq!(image.validate(), Validity::Valid);
}

#[test]
fn test_scenario_corrupted_trailer_keeps_fields() {
    let mut data = make_scenario_image();
    let last = data.len() - 1;
    data[last] ^= 0x80;

    let image = Image::parse(data).unwrap();

    assert!(!image.is_valid());
    assert!(matches!(image.validate(), Validity::ChecksumMismatch { .. }));
    let prog = image.program_sections();
    assert_eq!(prog.len(), 1);
    assert_eq!(&prog[0].data[..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(prog[0].flash_start_address, 0);
}

#[test]
fn test_empty_buffer_is_invalid_not_error() {
    let image = Image::parse(Vec::new()).unwrap();

    assert!(image.records().is_empty());
    assert!(image.header().is_none());
    assert!(image.trailer().is_none());
    assert!(!image.is_valid());
    assert_eq!(image.validate(), Validity::MissingHeader);
    assert_eq!(image.calculate_crc32(), 0);
}

#[test]
fn test_crc_reference_vector() {
    assert_eq!(crc32(b"123456789"), 0xCBF43926);
}

#[test]
fn test_calculate_crc32_matches_trailer() {
    let data = make_scenario_image();
    let image = Image::parse(data.clone()).unwrap();

    assert_eq!(image.calculate_crc32(), crc32(&data[..data.len() - 4]));
    assert_eq!(image.trailer().unwrap().checksum, image.calculate_crc32());
}

#[test]
fn test_header_wrong_length_names_header() {
    let mut data = make_record(TagKind::Header.id(), &[0; 12]);
    append_trailer(&mut data);

    let err = Image::parse(data).unwrap_err();
    assert!(matches!(
        err,
        ImageError::Format {
            tag: TagKind::Header,
            actual: 12,
            ..
        }
    ));
    assert!(err.to_string().contains("header"));
}

#[test]
fn test_application_wrong_length_names_application() {
    let mut data = make_header(SUPPORTED_VERSION, 0);
    data.extend(make_record(TagKind::Application.id(), &[0; 30]));
    append_trailer(&mut data);

    let err = Image::parse(data).unwrap_err();
    assert!(matches!(
        err,
        ImageError::Format {
            tag: TagKind::Application,
            actual: 30,
            ..
        }
    ));
    assert!(err.to_string().contains("application"));
}

#[test]
fn test_metadata_blocks_keep_order() {
    let mut data = make_header(SUPPORTED_VERSION, 0);
    data.extend(make_record(TagKind::Metadata.id(), b"abc"));
    data.extend(make_record(TagKind::Metadata.id(), b"defgh"));
    data.extend(make_record(TagKind::Metadata.id(), b"ij"));
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();
    let blocks: Vec<&[u8]> = image.metadata().iter().map(|m| &m.data[..]).collect();

    assert_eq!(blocks, vec![&b"abc"[..], &b"defgh"[..], &b"ij"[..]]);
    assert!(image.is_valid());
}

#[test]
fn test_program_sections_keep_order_and_compression() {
    let mut data = make_header(SUPPORTED_VERSION, 0);
    data.extend(make_program(TagKind::EraseProgram, 0x0000, &[1]));
    data.extend(make_program(TagKind::ProgramLz4, 0x4000, &[2, 2]));
    data.extend(make_program(TagKind::Program, 0x8000, &[3, 3, 3]));
    data.extend(make_program(TagKind::ProgramLzma, 0xC000, &[4]));
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();
    let summary: Vec<(u32, usize, Compression, bool)> = image
        .program_sections()
        .iter()
        .map(|p| (p.flash_start_address, p.data.len(), p.compression, p.erase_first))
        .collect();

    assert_eq!(
        summary,
        vec![
            (0x0000, 1, Compression::None, true),
            (0x4000, 2, Compression::Lz4, false),
            (0x8000, 3, Compression::None, false),
            (0xC000, 1, Compression::Lzma, false),
        ]
    );
}

#[test]
fn test_encryption_blocks_keep_order() {
    let mut init = 7u32.to_le_bytes().to_vec();
    init.extend_from_slice(&[0x5A; 12]);

    let mut data = make_header(SUPPORTED_VERSION, 0x01);
    data.extend(make_record(TagKind::EncryptionInit.id(), &init));
    data.extend(make_record(TagKind::EncryptionData.id(), &[1, 2, 3]));
    data.extend(make_record(TagKind::EncryptionData.id(), &[4, 5, 6, 7]));
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();

    assert!(image.is_encrypted());
    assert_eq!(image.encryption_init().unwrap().message_length, 7);
    assert_eq!(&image.encryption_init().unwrap().nonce[..], &[0x5A; 12]);
    let blocks: Vec<&[u8]> = image.encryption_data().iter().map(|b| &b.data[..]).collect();
    assert_eq!(blocks, vec![&[1u8, 2, 3][..], &[4u8, 5, 6, 7][..]]);
    assert!(image.is_valid());
}

#[test]
fn test_unknown_tag_between_records_is_skipped() {
    let mut plain = make_header(SUPPORTED_VERSION, 0);
    plain.extend(make_application());
    plain.extend(make_program(TagKind::Program, 0x1000, &[9; 16]));
    append_trailer(&mut plain);

    let mut with_unknown = make_header(SUPPORTED_VERSION, 0);
    with_unknown.extend(make_application());
    with_unknown.extend(make_record(0x0BAD_F00D, &[0xEE; 10]));
    with_unknown.extend(make_program(TagKind::Program, 0x1000, &[9; 16]));
    append_trailer(&mut with_unknown);

    let a = Image::parse(plain).unwrap();
    let b = Image::parse(with_unknown).unwrap();

    assert_eq!(a.header(), b.header());
    assert_eq!(a.application(), b.application());
    assert_eq!(a.program_sections(), b.program_sections());
    assert_eq!(b.records().len(), a.records().len() + 1);
    assert!(b.is_valid());
}

#[test]
fn test_truncated_record_header() {
    let mut data = make_scenario_image();
    data.extend_from_slice(&[0xFC, 0x04, 0x04, 0xFC, 0x04]);

    assert!(matches!(
        Image::parse(data),
        Err(ImageError::Truncated {
            needed: 8,
            available: 5,
            ..
        })
    ));
}

#[test]
fn test_truncated_payload() {
    let mut data = make_scenario_image();
    data.truncate(data.len() - 1);

    let err = Image::parse(data).unwrap_err();
    assert!(matches!(err, ImageError::Truncated { needed: 12, available: 11, .. }));
}

#[test]
fn test_missing_trailer_is_invalid() {
    let mut data = make_header(SUPPORTED_VERSION, 0);
    data.extend(make_program(TagKind::Program, 0, &[1, 2, 3, 4]));

    let image = Image::parse(data).unwrap();
    assert_eq!(image.validate(), Validity::MissingTrailer);
    assert_eq!(image.program_sections().len(), 1);
}

#[test]
fn test_unsupported_version_is_invalid() {
    let mut data = make_header(0x0400_0000, 0);
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();
    assert_eq!(
        image.validate(),
        Validity::UnsupportedVersion { found: 0x0400_0000 }
    );
}

#[test]
fn test_full_featured_image() {
    let mut bootloader = 0x0201_0005u32.to_le_bytes().to_vec();
    bootloader.extend_from_slice(&0x0FE1_0000u32.to_le_bytes());
    bootloader.extend_from_slice(&[0xB0; 32]);

    let mut se = 64u32.to_le_bytes().to_vec();
    se.extend_from_slice(&0x0001_0203u32.to_le_bytes());
    se.extend_from_slice(&[0x5E; 64]);

    let dependency = [0x02, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02];

    let mut certificate = vec![0x01, 0x00, 0x00, 0x00];
    certificate.extend_from_slice(&[0x4B; 64]);
    certificate.extend_from_slice(&3u32.to_le_bytes());
    certificate.extend_from_slice(&[0x51; 64]);
    assert_eq!(certificate.len(), CERTIFICATE_SIZE);

    let mut signature = vec![0x11; 32];
    signature.extend_from_slice(&[0x22; 32]);

    let mut data = make_header(SUPPORTED_VERSION, 0x100);
    data.extend(make_application());
    data.extend(make_record(TagKind::Bootloader.id(), &bootloader));
    data.extend(make_record(TagKind::SeUpgrade.id(), &se));
    data.extend(make_record(TagKind::VersionDependency.id(), &dependency));
    data.extend(make_record(TagKind::Metadata.id(), b"build=42"));
    data.extend(make_program(TagKind::Program, 0x0800_0000, &[0xAB; 256]));
    data.extend(make_record(TagKind::Certificate.id(), &certificate));
    data.extend(make_record(TagKind::Signature.id(), &signature));
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();
    assert!(image.is_valid());
    assert!(image.is_signed());
    assert!(!image.is_encrypted());

    let app = image.application().unwrap();
    assert_eq!(app.type_names(), vec!["mcu"]);
    assert_eq!(&app.product_id[..], b"0123456789abcdef");

    let bl = image.bootloader().unwrap();
    assert_eq!(
        (bl.version.major(), bl.version.minor(), bl.version.customer()),
        (2, 1, 5)
    );
    assert_eq!(bl.address, 0x0FE1_0000);
    assert_eq!(bl.data.len(), 32);

    let se = image.se_upgrade().unwrap();
    assert_eq!(se.blob_size, 64);
    assert_eq!(se.data.len(), 64);

    let dep = image.version_dependency().unwrap();
    assert_eq!((dep.image_type, dep.statement, dep.version), (2, 3, 0x0201_0000));

    let cert = image.certificate().unwrap();
    assert_eq!(cert.version, 3);
    assert_eq!(&cert.key[..], &[0x4B; 64]);
    assert_eq!(&cert.signature[..], &[0x51; 64]);

    let sig = image.signature().unwrap();
    assert_eq!(&sig.r[..], &[0x11; 32]);
    assert_eq!(&sig.s[..], &[0x22; 32]);

    assert_eq!(image.metadata().len(), 1);
    assert_eq!(image.program_sections()[0].data.len(), 256);
    assert_eq!(image.records().len(), 10);
}

#[test]
fn test_views_outlive_image() {
    let data = make_scenario_image();
    let section = {
        let image = Image::parse(data).unwrap();
        image.program_sections()[0].clone()
    };

    assert_eq!(&section.data[..], &[0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn test_duplicate_singleton_replaced_repeatable_kept() {
    let mut data = make_header(0x0200_0000, 0);
    data.extend(make_program(TagKind::Program, 0x100, &[1]));
    data.extend(make_header(SUPPORTED_VERSION, 0x01));
    data.extend(make_program(TagKind::Program, 0x200, &[2]));
    append_trailer(&mut data);

    let image = Image::parse(data).unwrap();

    assert!(!TagKind::Header.is_repeatable());
    assert!(TagKind::Program.is_repeatable());
    assert_eq!(image.header().unwrap().version, SUPPORTED_VERSION);
    assert!(image.is_encrypted());
    assert_eq!(image.program_sections().len(), 2);
    assert_eq!(image.records().len(), 5);
    assert!(image.is_valid());
}
