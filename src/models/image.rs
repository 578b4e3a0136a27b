//! Decoded Image Model
//!
//! The resource class held by the cache: an RGBA pixel buffer whose
//! release marks every shared handle as recycled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::cache::{Release, RemovalCause};
use crate::error::{CacheError, Result};

/// Bytes per pixel of the RGBA8 layout.
pub const BYTES_PER_PIXEL: u64 = 4;

/// A decoded RGBA8 image.
///
/// Clones share the pixel buffer and the recycled flag, so a renderer
/// holding a clone can observe that the cache has released the image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    recycled: Arc<AtomicBool>,
}

impl DecodedImage {
    /// Wraps a decoded pixel buffer.
    ///
    /// Fails with `InvalidArgument` if the buffer length does not match
    /// `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(CacheError::InvalidArgument(format!(
                "pixel buffer of {} bytes does not match {}x{} RGBA",
                pixels.len(),
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
            recycled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates a zero-filled image of the given dimensions.
    ///
    /// Fails with `InvalidArgument` if the buffer would not be addressable
    /// on this target.
    pub fn blank(width: u32, height: u32) -> Result<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![0u8; len].into(),
            recycled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Memory held by the pixel buffer in bytes.
    pub fn byte_count(&self) -> u64 {
        self.pixels.len() as u64
    }

    /// Cache weight of the image in units of `unit_bytes`, rounded up so a
    /// non-empty image never weighs zero.
    pub fn size_in_units(&self, unit_bytes: u64) -> u64 {
        self.byte_count().div_ceil(unit_bytes.max(1))
    }

    /// True once the cache has released this image.
    pub fn is_recycled(&self) -> bool {
        self.recycled.load(Ordering::Acquire)
    }
}

/// Byte length of a `width` x `height` RGBA8 buffer, computed in `usize`.
fn buffer_len(width: u32, height: u32) -> Result<usize> {
    let too_large = || {
        CacheError::InvalidArgument(format!(
            "{}x{} RGBA does not fit in addressable memory",
            width, height
        ))
    };
    let width = usize::try_from(width).map_err(|_| too_large())?;
    let height = usize::try_from(height).map_err(|_| too_large())?;
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL as usize))
        .ok_or_else(too_large)
}

impl Release for DecodedImage {
    fn release(self, cause: RemovalCause) {
        trace!(
            width = self.width,
            height = self.height,
            ?cause,
            "Recycling decoded image"
        );
        self.recycled.store(true, Ordering::Release);
    }
}
