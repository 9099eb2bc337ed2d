//! Error types for the VP8 RTP payload library.

use std::fmt;

use crate::picture::Dimensions;

/// Errors that can occur in the VP8 RTP payload library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Codec engine**: [`CodecInit`](Self::CodecInit), [`Encode`](Self::Encode),
///   [`Decode`](Self::Decode).
/// - **Scaling**: [`ScalerBuild`](Self::ScalerBuild), [`Scale`](Self::Scale).
/// - **Wire / bitstream**: [`Parse`](Self::Parse).
/// - **Setup**: [`InvalidConfig`](Self::InvalidConfig),
///   [`UnknownEncoding`](Self::UnknownEncoding).
///
/// Only the setup variants and [`CodecInit`](Self::CodecInit) stop a stream
/// from being built. Everything else drops the affected frame and the stream
/// carries on with the next tick.
#[derive(Debug, thiserror::Error)]
pub enum Vp8Error {
    /// Underlying I/O error (reading IVF input, sockets in integrations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec engine refused to initialize.
    #[error("codec initialization failed: {0}")]
    CodecInit(String),

    /// The codec engine failed to encode a frame.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The codec engine failed to decode a frame.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The scaler collaborator could not build a context for this geometry.
    #[error("failed to build scaler {src} -> {dst}: {reason}")]
    ScalerBuild {
        src: Dimensions,
        dst: Dimensions,
        reason: String,
    },

    /// A built scaler failed to convert a picture.
    #[error("scaling failed: {0}")]
    Scale(String),

    /// Malformed payload, keyframe header, RTP packet or container data.
    #[error("parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// No codec engine is registered under the requested encoding name.
    #[error("no codec registered for encoding: {0}")]
    UnknownEncoding(String),
}

impl Vp8Error {
    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }
}

/// Specific kind of parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A transport payload had no room for the payload descriptor.
    EmptyPayload,
    /// A keyframe was shorter than its fixed-size header.
    TruncatedKeyframeHeader { needed: usize, actual: usize },
    /// The keyframe start code was not `9d 01 2a`.
    BadStartCode,
    /// An RTP datagram was shorter than its declared header.
    ShortRtpHeader,
    /// The RTP version field was not 2.
    UnsupportedRtpVersion(u8),
    /// A container (IVF) was truncated or carried the wrong signature.
    InvalidContainer(&'static str),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::TruncatedKeyframeHeader { needed, actual } => write!(
                f,
                "keyframe header truncated ({actual} bytes, need {needed})"
            ),
            Self::BadStartCode => write!(f, "bad keyframe start code"),
            Self::ShortRtpHeader => write!(f, "RTP header truncated"),
            Self::UnsupportedRtpVersion(v) => write!(f, "unsupported RTP version {v}"),
            Self::InvalidContainer(what) => write!(f, "invalid container: {what}"),
        }
    }
}

/// Convenience alias for `Result<T, Vp8Error>`.
pub type Result<T> = std::result::Result<T, Vp8Error>;
