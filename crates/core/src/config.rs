//! Stream configuration.

use crate::error::{Result, Vp8Error};
use crate::media::fragmenter::DEFAULT_FRAGMENT_SIZE;
use crate::picture::Dimensions;

/// Default frame rate in frames per second.
pub const DEFAULT_FPS: f32 = 15.0;

/// Default target bitrate in bits per second (250 kbit/s).
pub const DEFAULT_BITRATE: u32 = 250 * 1024;

/// Default minimum spacing between decoding error notifications.
pub const DEFAULT_ERROR_REPORT_INTERVAL_MS: u64 = 5000;

/// How encoder output maps onto frames for marker placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentationMode {
    /// Every encoder output is a whole frame; each one ends with a marker.
    #[default]
    PerFrame,
    /// The encoder emits one output per partition; only the last partition
    /// of an encode call ends with a marker.
    PerPartition,
}

/// Encode stream configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub picture_size: Dimensions,
    /// Frames per second.
    pub fps: f32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    /// Maximum fragment payload in bytes, excluding the descriptor.
    pub fragment_size: usize,
    pub fragmentation: FragmentationMode,
}

impl EncoderConfig {
    /// Target bitrate as the codec engine expects it (kbit/s, 1024-based).
    pub fn target_bitrate_kbps(&self) -> u32 {
        self.bitrate / 1024
    }

    pub fn validate(&self) -> Result<()> {
        if self.picture_size.is_empty() {
            return Err(Vp8Error::InvalidConfig("picture size must be non-zero"));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Vp8Error::InvalidConfig("frame rate must be positive"));
        }
        if self.fragment_size == 0 {
            return Err(Vp8Error::InvalidConfig("fragment size must be non-zero"));
        }
        Ok(())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            picture_size: Dimensions::CIF,
            fps: DEFAULT_FPS,
            bitrate: DEFAULT_BITRATE,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            fragmentation: FragmentationMode::PerFrame,
        }
    }
}

/// Decode stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Minimum time between two decoding error notifications.
    pub error_report_interval_ms: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            error_report_interval_ms: DEFAULT_ERROR_REPORT_INTERVAL_MS,
        }
    }
}
