//! ROM image loading and validation.
//!
//! The board takes a single 64 KiB ROM blob; the hardware splits it into
//! two 32 KiB halves selected by the B15 banking latch. Any other image
//! size is a fatal load error — partial images would leave the upper half
//! (and the monitor entry points inside it) undefined.

use std::fmt;
use std::path::Path;

pub const ROM_IMAGE_LEN: usize = 0x10000;

/// Errors that can occur when loading a ROM image.
#[derive(Debug)]
pub enum RomLoadError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// The image is not exactly 64 KiB.
    InvalidRom { actual: usize },
}

impl fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidRom { actual } => {
                write!(f, "ROM must be exactly {ROM_IMAGE_LEN} bytes (got {actual})")
            }
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A validated 64 KiB ROM image.
pub struct RomImage {
    bytes: Box<[u8]>,
}

impl RomImage {
    /// Validate a byte slice as a ROM image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RomLoadError> {
        if bytes.len() != ROM_IMAGE_LEN {
            return Err(RomLoadError::InvalidRom {
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec().into_boxed_slice(),
        })
    }

    /// Read and validate a ROM image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RomLoadError> {
        let data = std::fs::read(path.as_ref())?;
        let image = Self::from_bytes(&data)?;
        log::info!("loaded ROM image {}", path.as_ref().display());
        Ok(image)
    }

    /// The full 64 KiB image.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// One 32 KiB half (0 or 1), as addressed by the B15 latch.
    pub fn half(&self, i: usize) -> &[u8] {
        &self.bytes[(i & 1) * 0x8000..][..0x8000]
    }
}
