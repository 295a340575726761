#![no_main]

use gbl_image::{ImageParser, ParseOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parser = ImageParser::new(ParseOptions::strict().with_max_records(1024));
    if let Ok(image) = parser.parse(data.to_vec()) {
        assert!(image.records().len() <= 1024);
        assert!(image.records().iter().all(|entry| entry.kind.is_some()));
    }
});
