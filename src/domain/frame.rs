//! Captured camera frames handed to the engine.

/// Error describing why a frame was rejected at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Frame has a zero dimension or no pixel data
    #[error("frame is empty ({width}x{height}, {len} bytes)")]
    Empty {
        /// Frame width
        width: u32,
        /// Frame height
        height: u32,
        /// Pixel buffer length
        len: usize,
    },

    /// Channel count is not one the engine accepts
    #[error("unsupported channel count {channels} (expected 1, 3, or 4)")]
    UnsupportedChannels {
        /// Offending channel count
        channels: u8,
    },

    /// Pixel buffer length does not match the declared geometry
    #[error("pixel buffer length {len} does not match {width}x{height}x{channels}")]
    LengthMismatch {
        /// Frame width
        width: u32,
        /// Frame height
        height: u32,
        /// Channel count
        channels: u8,
        /// Pixel buffer length
        len: usize,
    },
}

/// A raw pixel buffer with its geometry.
///
/// The engine treats pixel contents as opaque; they are forwarded to the
/// selected backend's inference function unchanged.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    /// Wrap a pixel buffer. Geometry is validated lazily at
    /// `process_frame` time so capture code can stay on its fast path.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        Self {
            pixels,
            width,
            height,
            channels,
        }
    }

    /// Validate geometry: non-zero size, supported channel count,
    /// buffer length consistent with dimensions.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 || self.pixels.is_empty() {
            return Err(FrameError::Empty {
                width: self.width,
                height: self.height,
                len: self.pixels.len(),
            });
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(FrameError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.pixels.len() != expected {
            return Err(FrameError::LengthMismatch {
                width: self.width,
                height: self.height,
                channels: self.channels,
                len: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// Raw pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per pixel
    pub fn channels(&self) -> u8 {
        self.channels
    }
}
