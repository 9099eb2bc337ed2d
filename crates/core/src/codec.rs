//! Seams to the collaborators this crate drives but does not implement:
//! the VP8 codec engine and the picture scaler.
//!
//! A production build plugs libvpx and a swscale-like scaler in behind these
//! traits; tests use in-memory fakes.

use bytes::Bytes;

use crate::config::EncoderConfig;
use crate::error::Result;
use crate::picture::{Dimensions, YuvPicture};

/// One output unit from the encoder: a whole frame, or a single partition
/// when the engine runs in partition output mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPartition {
    pub data: Bytes,
    pub is_keyframe: bool,
    pub partition_id: u8,
}

/// A picture produced by the decoder, at its coded size, together with the
/// size it is meant to be displayed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub picture: YuvPicture,
    pub display: Dimensions,
}

/// VP8 encoder instance.
pub trait Vp8Encoder: Send {
    /// Apply picture size, frame rate and bitrate from `config`.
    fn configure(&mut self, config: &EncoderConfig) -> Result<()>;

    /// Encode one raw I420 picture. `force_keyframe` requests an intra frame.
    fn encode(&mut self, raw: &YuvPicture, force_keyframe: bool) -> Result<Vec<EncodedPartition>>;
}

/// VP8 decoder instance.
pub trait Vp8Decoder: Send {
    /// Decode one reassembled frame into zero or more pictures.
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<DecodedImage>>;
}

/// A scaling context bound to one source and destination geometry.
///
/// Dropping the box releases the context.
pub trait Scaler: Send {
    fn scale(&mut self, src: &YuvPicture, dst: &mut YuvPicture) -> Result<()>;
}

/// Builds scaling contexts.
pub trait ScalerFactory: Send {
    fn build(&self, src: Dimensions, dst: Dimensions) -> Result<Box<dyn Scaler>>;
}

/// A codec implementation that can mint encoder and decoder instances.
///
/// Registered with a [`CodecRegistry`](crate::registry::CodecRegistry) under
/// its encoding name.
pub trait CodecEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    fn new_encoder(&self, config: &EncoderConfig) -> Result<Box<dyn Vp8Encoder>>;

    fn new_decoder(&self) -> Result<Box<dyn Vp8Decoder>>;
}
