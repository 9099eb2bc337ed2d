//! VP8 over RTP: the payload layer between a VP8 codec engine and a packet
//! transport.
//!
//! ```text
//! encode: EncodeStream  -> KeyframeScheduler -> Vp8Encoder -> Fragmenter  -> transport
//! decode: transport     -> Reassembler       -> Vp8Decoder -> RescaleDetector -> Scaler
//! ```
//!
//! The codec engine and scaler are external; they are reached through the
//! traits in [`codec`] and selected through a caller-owned [`CodecRegistry`].

pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod keyframe;
pub mod media;
pub mod picture;
pub mod registry;
pub mod rescale;

pub use codec::{
    CodecEngine, DecodedImage, EncodedPartition, Scaler, ScalerFactory, Vp8Decoder, Vp8Encoder,
};
pub use config::{DecoderConfig, EncoderConfig, FragmentationMode};
pub use decoder::{DecodeStream, DecoderEvent, EventSink, NullSink};
pub use encoder::EncodeStream;
pub use error::{ParseErrorKind, Result, Vp8Error};
pub use keyframe::KeyframeScheduler;
pub use media::{AssembledFrame, Fragmenter, Packet, PartitionInfo, PayloadDescriptor, Reassembler};
pub use picture::{Dimensions, YuvPicture};
pub use registry::{CodecRegistry, VP8_ENCODING};
pub use rescale::RescaleDetector;
