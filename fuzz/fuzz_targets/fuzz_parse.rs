#![no_main]

use gbl_image::{Image, ImageReport};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = Image::parse(data.to_vec()) {
        let _ = image.validate();
        let _ = ImageReport::new(&image);
    }
});
