/// Pixel layout of the rows handed to the writer.
///
/// Each format fixes the PNG bit depth and color type written to IHDR.
/// Rows are expected in PNG sample order: 16-bit samples big-endian,
/// 1-bit samples packed MSB-first with the last byte zero-padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 channels, 8-bit RGB.
    Rgb8,
    /// 3 channels, 16-bit RGB (big endian).
    Rgb16,
    /// 4 channels, 8-bit RGBA.
    Rgba8,
    /// Single channel, 8-bit grayscale.
    Gray8,
    /// Single channel, 1-bit black and white (0 = black).
    Monochrome1,
}

/// Channel arrangement written to the IHDR color type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    Rgb,
    RgbAlpha,
    Gray,
}

impl ChannelLayout {
    /// Number of samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::RgbAlpha => 4,
        }
    }

    pub(crate) fn color_type(self) -> png::ColorType {
        match self {
            Self::Gray => png::ColorType::Grayscale,
            Self::Rgb => png::ColorType::Rgb,
            Self::RgbAlpha => png::ColorType::Rgba,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct FormatParams {
    bit_depth: u8,
    layout: ChannelLayout,
}

// Indexed by `PixelFormat as usize`; keep in declaration order.
const FORMAT_TABLE: [FormatParams; 5] = [
    FormatParams {
        bit_depth: 8,
        layout: ChannelLayout::Rgb,
    },
    FormatParams {
        bit_depth: 16,
        layout: ChannelLayout::Rgb,
    },
    FormatParams {
        bit_depth: 8,
        layout: ChannelLayout::RgbAlpha,
    },
    FormatParams {
        bit_depth: 8,
        layout: ChannelLayout::Gray,
    },
    FormatParams {
        bit_depth: 1,
        layout: ChannelLayout::Gray,
    },
];

impl PixelFormat {
    /// Every supported format, in declaration order.
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::Rgb8,
        PixelFormat::Rgb16,
        PixelFormat::Rgba8,
        PixelFormat::Gray8,
        PixelFormat::Monochrome1,
    ];

    fn params(self) -> FormatParams {
        FORMAT_TABLE[self as usize]
    }

    /// Bits per channel sample.
    pub fn bit_depth(self) -> u8 {
        self.params().bit_depth
    }

    pub fn channel_layout(self) -> ChannelLayout {
        self.params().layout
    }

    /// Number of channels.
    pub fn channels(self) -> usize {
        self.channel_layout().channels()
    }

    pub fn bits_per_pixel(self) -> usize {
        usize::from(self.bit_depth()) * self.channels()
    }

    /// Packed size of one row in bytes, or `None` on overflow.
    pub fn row_bytes(self, width: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(self.bits_per_pixel())
            .map(|bits| bits.div_ceil(8))
    }

    pub(crate) fn engine_depth(self) -> png::BitDepth {
        match self.bit_depth() {
            1 => png::BitDepth::One,
            16 => png::BitDepth::Sixteen,
            _ => png::BitDepth::Eight,
        }
    }
}
