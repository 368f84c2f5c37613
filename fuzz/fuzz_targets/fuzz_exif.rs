#![no_main]

use libfuzzer_sys::fuzz_target;
use png_structure::exif;
use png_structure::tiff::IfdBuilder;

fuzz_target!(|data: &[u8]| {
    // Treat the input as a raw eXIf payload
    if let Ok(ifd) = exif::decode_payload(data) {
        // Whatever decodes must re-encode and decode again
        let builder = IfdBuilder::from_ifd(&ifd);
        if let Ok(encoded) = exif::encode_payload(&builder) {
            let _ = exif::decode_payload(&encoded);
        }
    }
});
