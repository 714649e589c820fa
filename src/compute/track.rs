//! Rasterized track mask.
//!
//! The presentation layer owns the image; the engine only needs to know
//! which pixels are drivable. A pixel is a wall when its red channel is
//! below the configured threshold. Anything outside the image is a wall.

use crate::schema::{TrackConfig, TrackShape};

/// Read-only drivable-pixel mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    width: usize,
    height: usize,
    on_track: Vec<bool>,
}

impl Track {
    /// Build from one red-channel byte per pixel, row-major.
    pub fn from_red_channel(
        width: usize,
        height: usize,
        red: &[u8],
        threshold: u8,
    ) -> Result<Self, TrackError> {
        check_dimensions(width, height)?;
        if red.len() != width * height {
            return Err(TrackError::BufferSize {
                expected: width * height,
                actual: red.len(),
            });
        }
        Ok(Self {
            width,
            height,
            on_track: red.iter().map(|&r| r >= threshold).collect(),
        })
    }

    /// Build from a tightly packed RGBA8 pixel buffer, row-major.
    pub fn from_rgba(
        width: usize,
        height: usize,
        rgba: &[u8],
        threshold: u8,
    ) -> Result<Self, TrackError> {
        check_dimensions(width, height)?;
        if rgba.len() != width * height * 4 {
            return Err(TrackError::BufferSize {
                expected: width * height * 4,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            on_track: rgba.chunks_exact(4).map(|px| px[0] >= threshold).collect(),
        })
    }

    /// Track where every pixel is drivable.
    pub fn open(width: usize, height: usize) -> Result<Self, TrackError> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            on_track: vec![true; width * height],
        })
    }

    /// Elliptical ring centered in the image, semi-axes in pixels.
    pub fn oval(
        width: usize,
        height: usize,
        outer: (f32, f32),
        inner: (f32, f32),
    ) -> Result<Self, TrackError> {
        check_dimensions(width, height)?;
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let inside = |dx: f32, dy: f32, axes: (f32, f32)| {
            axes.0 > 0.0 && axes.1 > 0.0 && (dx / axes.0).powi(2) + (dy / axes.1).powi(2) <= 1.0
        };

        let mut on_track = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                on_track.push(inside(dx, dy, outer) && !inside(dx, dy, inner));
            }
        }
        Ok(Self {
            width,
            height,
            on_track,
        })
    }

    /// Rasterize the shape described by a track configuration.
    pub fn from_config(config: &TrackConfig) -> Result<Self, TrackError> {
        match config.shape {
            TrackShape::Oval { outer, inner } => {
                Self::oval(config.width, config.height, outer, inner)
            }
            TrackShape::Open => Self::open(config.width, config.height),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image center; its midlines define lap progress.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Whether the pixel containing (x, y) is a wall or outside the image.
    #[inline]
    pub fn is_off_track(&self, x: f32, y: f32) -> bool {
        // NaN fails both comparisons and lands here too.
        if !(x >= 0.0 && y >= 0.0) {
            return true;
        }
        let (px, py) = (x as usize, y as usize);
        if px >= self.width || py >= self.height {
            return true;
        }
        !self.on_track[py * self.width + px]
    }

    /// Fraction of drivable pixels.
    pub fn coverage(&self) -> f32 {
        self.on_track.iter().filter(|&&v| v).count() as f32 / self.on_track.len() as f32
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), TrackError> {
    if width == 0 || height == 0 {
        return Err(TrackError::EmptyImage);
    }
    Ok(())
}

/// Errors building a track mask.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Track image must have non-zero dimensions")]
    EmptyImage,
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}
