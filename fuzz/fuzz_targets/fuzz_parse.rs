#![no_main]

use libfuzzer_sys::fuzz_target;
use png_structure::{ChunkData, ContainerIO, PngIO};

fuzz_target!(|data: &[u8]| {
    // Any input should parse or fail cleanly, never panic
    if let Ok(png) = PngIO::new().parse_bytes(data) {
        let _ = png.index().tallies();
        let _ = png.image_header();
        let _ = png.corrupt_chunks();

        for chunk in png.chunks() {
            let _ = ChunkData::decode(chunk);
        }

        let _ = png.exif();
        let _ = png.exif_builder();
    }
});
