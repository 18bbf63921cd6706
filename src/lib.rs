//! # zenpngwrite
//!
//! Streaming PNG writer for renderer output.
//!
//! Rows are pushed one at a time (or in batches) into a [`PngWriter`], which
//! drives the [`png`] crate as its compression engine. The writer owns the
//! engine for exactly one image and enforces the `init` → rows → `close`
//! protocol; every engine call runs behind a fault boundary, so neither an
//! engine error nor a panic from the sink escapes as anything other than a
//! [`PngWriteError`].
//!
//! ## Pixel formats
//!
//! | [`PixelFormat`] | bit depth | color type |
//! |-----------------|-----------|------------|
//! | `Rgb8`          | 8         | RGB        |
//! | `Rgb16`         | 16        | RGB        |
//! | `Rgba8`         | 8         | RGBA       |
//! | `Gray8`         | 8         | gray       |
//! | `Monochrome1`   | 1         | gray       |
//!
//! ## Metadata
//!
//! - Physical resolution: DPI converted to pixels per meter (pHYs), always
//!   written. Negative or unrepresentable values are rejected.
//! - Color profile: an ICC profile (iCCP) or the sRGB marker, never both.
//!
//! ## Diagnostics
//!
//! Failures are logged once through the [`log`] facade (target
//! `zenpngwrite`) and returned to the caller.
//!
//! ## Usage
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufWriter;
//! use zenpngwrite::{PixelFormat, PngWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = BufWriter::new(File::create("page.png")?);
//! let mut writer = PngWriter::new(PixelFormat::Rgb8);
//! writer.set_srgb_profile()?;
//! writer.init(file, 640, 480, 150.0, 150.0)?;
//! let row = vec![255u8; 640 * 3];
//! for _ in 0..480 {
//!     writer.write_row(&row)?;
//! }
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod encode;
mod error;
mod fault;
mod pixel;
mod profile;
mod resolution;
mod sink;
mod writer;

// Re-exports
pub use encode::EncodeRequest;
pub use enough::{Stop, Unstoppable};
pub use error::{PngWriteError, Stage};
pub use pixel::{ChannelLayout, PixelFormat};
pub use profile::ColorProfile;
pub use resolution::{METERS_PER_INCH, Resolution};
pub use sink::MemorySink;
pub use writer::{Compression, MAX_DIMENSION, MAX_ROW_BYTES, Phase, PngWriter};
