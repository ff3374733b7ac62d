//! Decoded video frames.

use std::ops::Range;

use image::RgbImage;
use vidgate_core::Error;

use crate::Result;

/// A decoded RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: RgbImage,
}

impl Frame {
    /// Decode JPEG or PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeFailure`] if the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| Error::DecodeFailure(format!("Failed to decode frame: {err}")))?;
        Ok(Self::from_rgb(image.to_rgb8()))
    }

    /// Wrap an already decoded raster.
    #[must_use]
    pub const fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `[red, green, blue]` at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the frame.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels.get_pixel(x, y).0
    }

    /// True when both frames have the same dimensions.
    #[must_use]
    pub fn same_dimensions(&self, other: &Self) -> bool {
        self.pixels.dimensions() == other.pixels.dimensions()
    }

    /// The central sampling window, excluding the outer third on each side.
    #[must_use]
    pub fn central_window(&self) -> Window {
        let (width, height) = self.pixels.dimensions();
        Window {
            xs: width / 3..width - width / 3,
            ys: height / 3..height - height / 3,
        }
    }

    /// Pixels inside the central window, row by row.
    pub fn window_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.central_window()
            .coordinates()
            .map(|(x, y)| self.pixel(x, y))
    }

    /// Every pixel of the frame.
    pub fn all_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels.pixels().map(|pixel| pixel.0)
    }

    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

/// Rectangular pixel region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    xs: Range<u32>,
    ys: Range<u32>,
}

impl Window {
    /// Number of pixels inside the window.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.xs.end.saturating_sub(self.xs.start))
            * u64::from(self.ys.end.saturating_sub(self.ys.start))
    }

    /// True when the window covers no pixel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(x, y)` coordinates, row by row.
    pub fn coordinates(&self) -> impl Iterator<Item = (u32, u32)> {
        let xs = self.xs.clone();
        self.ys
            .clone()
            .flat_map(move |y| xs.clone().map(move |x| (x, y)))
    }
}
