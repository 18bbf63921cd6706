use crate::error::PngWriteError;

/// Length of one inch in meters.
pub const METERS_PER_INCH: f64 = 0.0254;

/// Physical resolution in pixels per meter, as stored in the pHYs chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub x_pixels_per_meter: u32,
    pub y_pixels_per_meter: u32,
}

impl Resolution {
    /// Convert dots per inch to pixels per meter.
    ///
    /// Negative or NaN values fail with [`PngWriteError::InvalidResolution`].
    /// Values whose converted form exceeds `u32::MAX` fail with
    /// [`PngWriteError::ResolutionOutOfRange`]. Fractional results truncate.
    pub fn from_dpi(horizontal_dpi: f64, vertical_dpi: f64) -> Result<Self, PngWriteError> {
        let negative = |dpi: f64| dpi.is_nan() || dpi < 0.0;
        if negative(horizontal_dpi) || negative(vertical_dpi) {
            return Err(PngWriteError::InvalidResolution {
                horizontal_dpi,
                vertical_dpi,
            });
        }

        let x = horizontal_dpi / METERS_PER_INCH;
        let y = vertical_dpi / METERS_PER_INCH;
        let max = f64::from(u32::MAX);
        if x > max || y > max {
            return Err(PngWriteError::ResolutionOutOfRange {
                horizontal_dpi,
                vertical_dpi,
            });
        }

        Ok(Self {
            x_pixels_per_meter: x as u32,
            y_pixels_per_meter: y as u32,
        })
    }

    pub(crate) fn pixel_dims(&self) -> png::PixelDimensions {
        png::PixelDimensions {
            xppu: self.x_pixels_per_meter,
            yppu: self.y_pixels_per_meter,
            unit: png::Unit::Meter,
        }
    }
}
