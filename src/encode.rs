use enough::Stop;

use crate::error::PngWriteError;
use crate::pixel::PixelFormat;
use crate::sink::MemorySink;
use crate::writer::{Compression, PngWriter};

/// One-shot PNG encode of a contiguous pixel buffer.
///
/// Builds a [`PngWriter`], writes every row and returns the encoded bytes.
/// Requesting both an ICC profile and the sRGB marker fails with
/// [`PngWriteError::ProfileAlreadySet`].
#[derive(Clone, Debug)]
pub struct EncodeRequest<'a> {
    format: PixelFormat,
    horizontal_dpi: f64,
    vertical_dpi: f64,
    icc_profile: Option<(&'a str, &'a [u8])>,
    srgb: bool,
    compression: Compression,
}

impl<'a> EncodeRequest<'a> {
    /// Encode `format` rows at 72 dpi with no color profile.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            horizontal_dpi: 72.0,
            vertical_dpi: 72.0,
            icc_profile: None,
            srgb: false,
            compression: Compression::default(),
        }
    }

    pub fn with_dpi(mut self, horizontal: f64, vertical: f64) -> Self {
        self.horizontal_dpi = horizontal;
        self.vertical_dpi = vertical;
        self
    }

    pub fn with_icc_profile(mut self, name: &'a str, data: &'a [u8]) -> Self {
        self.icc_profile = Some((name, data));
        self
    }

    pub fn with_srgb(mut self) -> Self {
        self.srgb = true;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Encode `height` rows of packed pixels.
    pub fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        stop: impl Stop,
    ) -> Result<Vec<u8>, PngWriteError> {
        let sink = MemorySink::new();
        let mut writer = PngWriter::new(self.format);
        writer.set_compression(self.compression)?;
        if let Some((name, data)) = self.icc_profile {
            writer.set_icc_profile(name, data)?;
        }
        if self.srgb {
            writer.set_srgb_profile()?;
        }
        writer.init(
            sink.clone(),
            width,
            height,
            self.horizontal_dpi,
            self.vertical_dpi,
        )?;
        writer.write_image(pixels, stop)?;
        writer.close()?;
        Ok(sink.take())
    }
}
