#![no_main]

use libfuzzer_sys::fuzz_target;
use png_structure::tiff::TagValue;
use png_structure::{ContainerIO, PngIO};

fuzz_target!(|data: &[u8]| {
    if let Ok(mut png) = PngIO::new().parse_bytes(data) {
        // Unmodified output must reproduce the input exactly
        let mut output = Vec::new();
        if png.write_to(&mut output).is_ok() {
            assert_eq!(output, data);
        }

        // Editing EXIF and writing must not panic
        if let Ok(mut exif) = png.exif_builder() {
            let _ = exif.set_named("ImageDescription", TagValue::Ascii("fuzz".into()));
            if png.set_exif(&exif).is_ok() {
                let mut output = Vec::new();
                let _ = png.write_to(&mut output);
            }
        }
    }
});
