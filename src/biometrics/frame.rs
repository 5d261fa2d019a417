//! RGB image frames as delivered by the eye capture collaborator

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// An interleaved 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    width: u32,
    height: u32,
    /// Row-major RGB triples, `width * height * 3` bytes
    pixels: Vec<u8>,
}

/// Unchecked wire form, validated on deserialize
#[derive(Deserialize)]
struct RawFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = ValidationError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        Frame::new(raw.width, raw.height, raw.pixels)
    }
}

impl Frame {
    /// Build a frame, rejecting buffers whose length does not match the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ValidationError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| {
                ValidationError::InvalidRange(format!("frame {}x{} is too large", width, height))
            })?;
        if pixels.len() != expected {
            return Err(ValidationError::InvalidFormat(format!(
                "frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Zero-area frames carry no signal and must not reach the extractors
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB triple at `(x, y)`. Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Rec. 601 luma at `(x, y)`, in `0.0..=255.0`
    pub fn luma(&self, x: u32, y: u32) -> f64 {
        luma_of(self.pixel(x, y))
    }

    /// Nearest-neighbour resample to `width` x `height`.
    ///
    /// An empty source resamples to black.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.is_empty() {
            return Frame::from_fn(width, height, |_, _| [0, 0, 0]);
        }

        Frame::from_fn(width, height, |x, y| {
            let sx = (x as u64 * self.width as u64 / width as u64) as u32;
            let sy = (y as u64 * self.height as u64 / height as u64) as u32;
            self.pixel(sx.min(self.width - 1), sy.min(self.height - 1))
        })
    }
}

pub fn luma_of([r, g, b]: [u8; 3]) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}
