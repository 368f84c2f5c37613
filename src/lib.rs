//! Structural reading, editing and writing of PNG chunk streams.
//!
//! This crate parses a PNG file into its ordered chunk sequence, keeps every chunk
//! byte-exact so the file can be written back unchanged, and offers targeted edits
//! of the EXIF metadata carried in the `eXIf` chunk. Pixel data is never decoded.
//!
//! # Design Principles
//!
//! - **Byte-exact round trips**: Parsing then writing reproduces the input
//! - **Bounded reads**: Declared lengths are checked against the stream before allocating
//! - **Lenient by default**: Bad CRCs are recorded, not rejected, unless asked for
//! - **Structured EXIF**: The `eXIf` payload is exposed as a typed IFD tree
//!
//! # Quick Start
//!
//! ```no_run
//! use png_structure::{ContainerIO, PngIO};
//!
//! # fn main() -> png_structure::Result<()> {
//! let png = PngIO::new().parse_file("image.png")?;
//!
//! for (chunk_type, chunks) in png.index().iter() {
//!     println!("{}: {} chunk(s)", chunk_type, chunks.len());
//! }
//!
//! if let Some(header) = png.image_header()? {
//!     println!("{}x{}", header.width, header.height);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Editing EXIF
//!
//! ```no_run
//! use png_structure::{ContainerIO, PngIO};
//! use png_structure::tiff::TagValue;
//! use std::fs::File;
//!
//! # fn main() -> png_structure::Result<()> {
//! let mut png = PngIO::new().parse_file("image.png")?;
//!
//! // Starts from the existing tags, or an empty tree if there is no eXIf chunk
//! let mut exif = png.exif_builder()?;
//! exif.set_named("ImageDescription", TagValue::Ascii("sunset".into()))?;
//! png.set_exif(&exif)?;
//!
//! let mut output = File::create("output.png")?;
//! png.write_to(&mut output)?;
//! # Ok(())
//! # }
//! ```

mod chunk;
mod chunk_data;
mod chunk_slice;
mod containers;
pub mod crc;
mod error;
pub mod exif;
mod reader;
pub mod tiff;

pub use chunk::{Chunk, ChunkType, CHUNK_OVERHEAD, MAX_CHUNK_SIZE};
pub use chunk_data::{ChunkData, ImageHeader, LastModified, PhysicalDimensions};
pub use chunk_slice::{ChunkIndex, ChunkSlice};
pub use containers::{png_io::PngIO, png_io::PNG_SIGNATURE, ContainerIO};
pub use crc::chunk_crc;
pub use error::{Error, Result};
pub use reader::{ChunkReader, ParseOptions};

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
