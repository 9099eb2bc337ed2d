//! VP8 uncompressed data chunk parsing (RFC 6386 §9.1).
//!
//! Every VP8 frame starts with a 3-byte frame tag. Keyframes follow it with
//! a 7-byte block carrying a start code and the coded picture size:
//!
//! ```text
//! offset  size  field
//! 0       3     frame tag; bit 0 of byte 0 is 0 for a keyframe
//! 3       3     start code 9d 01 2a
//! 6       2     width, little endian: low 14 bits size, top 2 bits
//!               horizontal scaling mode (byte 7 >> 6)
//! 8       2     height, little endian: low 14 bits size, top 2 bits
//!               vertical scaling mode (byte 9 >> 6)
//! ```
//!
//! These offsets are only read here. Out-of-range access is reported as a
//! [`ParseErrorKind`] and never touches memory past the buffer.

use crate::error::{ParseErrorKind, Result, Vp8Error};

/// Bytes occupied by the frame tag and keyframe header.
pub const KEYFRAME_HEADER_LEN: usize = 10;

const FRAME_TAG_LEN: usize = 3;
const START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];
const WIDTH_OFFSET: usize = 6;
const HEIGHT_OFFSET: usize = 8;
const SIZE_MASK: u16 = 0x3fff;

/// Upscaling mode signalled by the encoder in each keyframe.
///
/// The coded picture is `floor(display * num / den)` in each direction; the
/// receiver scales it back up to the display size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingMode {
    #[default]
    Normal,
    FourFive,
    ThreeFive,
    OneTwo,
}

impl ScalingMode {
    /// Map the 2-bit code from the keyframe header.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => Self::FourFive,
            2 => Self::ThreeFive,
            3 => Self::OneTwo,
            _ => Self::Normal,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::FourFive => 1,
            Self::ThreeFive => 2,
            Self::OneTwo => 3,
        }
    }

    /// `(numerator, denominator)` of the ratio.
    pub fn ratio(self) -> (u32, u32) {
        match self {
            Self::Normal => (1, 1),
            Self::FourFive => (4, 5),
            Self::ThreeFive => (3, 5),
            Self::OneTwo => (1, 2),
        }
    }

    /// `floor(size * num / den)`, computed without overflow.
    pub fn scale(self, size: u32) -> u32 {
        let (num, den) = self.ratio();
        (u64::from(size) * u64::from(num) / u64::from(den)) as u32
    }
}

/// Fields of a keyframe's uncompressed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeHeader {
    pub width: u16,
    pub height: u16,
    pub horizontal_scale: ScalingMode,
    pub vertical_scale: ScalingMode,
}

/// Whether the frame tag marks this frame as a keyframe.
///
/// Empty input is not a keyframe.
pub fn is_keyframe(frame: &[u8]) -> bool {
    frame.first().is_some_and(|tag| tag & 0x01 == 0)
}

/// Read the frame tag and keyframe header from the start of a frame.
pub fn parse_keyframe_header(frame: &[u8]) -> Result<KeyframeHeader> {
    let header = frame.get(..KEYFRAME_HEADER_LEN).ok_or_else(|| {
        Vp8Error::parse(ParseErrorKind::TruncatedKeyframeHeader {
            needed: KEYFRAME_HEADER_LEN,
            actual: frame.len(),
        })
    })?;

    if header[FRAME_TAG_LEN..WIDTH_OFFSET] != START_CODE {
        return Err(Vp8Error::parse(ParseErrorKind::BadStartCode));
    }

    let width = u16::from_le_bytes([header[WIDTH_OFFSET], header[WIDTH_OFFSET + 1]]);
    let height = u16::from_le_bytes([header[HEIGHT_OFFSET], header[HEIGHT_OFFSET + 1]]);

    Ok(KeyframeHeader {
        width: width & SIZE_MASK,
        height: height & SIZE_MASK,
        horizontal_scale: ScalingMode::from_bits((width >> 14) as u8),
        vertical_scale: ScalingMode::from_bits((height >> 14) as u8),
    })
}

#[cfg(test)]
pub(crate) fn keyframe_bytes(
    width: u16,
    height: u16,
    h: ScalingMode,
    v: ScalingMode,
) -> Vec<u8> {
    let w = (width & SIZE_MASK) | (u16::from(h.bits()) << 14);
    let hh = (height & SIZE_MASK) | (u16::from(v.bits()) << 14);
    let mut frame = vec![0x10, 0x02, 0x00];
    frame.extend_from_slice(&START_CODE);
    frame.extend_from_slice(&w.to_le_bytes());
    frame.extend_from_slice(&hh.to_le_bytes());
    frame.extend_from_slice(&[0xAA; 6]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_table() {
        assert_eq!(ScalingMode::OneTwo.scale(1000), 500);
        assert_eq!(ScalingMode::ThreeFive.scale(1000), 600);
        assert_eq!(ScalingMode::FourFive.scale(1000), 800);
        assert_eq!(ScalingMode::Normal.scale(1000), 1000);
    }

    #[test]
    fn scaling_floors() {
        assert_eq!(ScalingMode::OneTwo.scale(351), 175);
        assert_eq!(ScalingMode::ThreeFive.scale(352), 211);
        assert_eq!(ScalingMode::FourFive.scale(u32::MAX), 3_435_973_836);
    }

    #[test]
    fn mode_bits_round_trip() {
        for bits in 0..4u8 {
            assert_eq!(ScalingMode::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn parse_cif_keyframe() {
        let frame = keyframe_bytes(352, 288, ScalingMode::Normal, ScalingMode::OneTwo);
        let hdr = parse_keyframe_header(&frame).unwrap();
        assert_eq!(hdr.width, 352);
        assert_eq!(hdr.height, 288);
        assert_eq!(hdr.horizontal_scale, ScalingMode::Normal);
        assert_eq!(hdr.vertical_scale, ScalingMode::OneTwo);
    }

    #[test]
    fn scale_bits_sit_in_top_of_bytes_7_and_9() {
        let frame = keyframe_bytes(0, 0, ScalingMode::ThreeFive, ScalingMode::FourFive);
        assert_eq!(frame[7] >> 6, 2);
        assert_eq!(frame[9] >> 6, 1);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let frame = keyframe_bytes(352, 288, ScalingMode::Normal, ScalingMode::Normal);
        let err = parse_keyframe_header(&frame[..9]).unwrap_err();
        assert!(matches!(
            err,
            Vp8Error::Parse {
                kind: ParseErrorKind::TruncatedKeyframeHeader {
                    needed: 10,
                    actual: 9
                }
            }
        ));
    }

    #[test]
    fn bad_start_code_is_an_error() {
        let mut frame = keyframe_bytes(352, 288, ScalingMode::Normal, ScalingMode::Normal);
        frame[4] = 0;
        assert!(parse_keyframe_header(&frame).is_err());
    }

    #[test]
    fn frame_tag_keyframe_bit() {
        assert!(is_keyframe(&[0x10, 0x02, 0x00]));
        assert!(!is_keyframe(&[0x11, 0x02, 0x00]));
        assert!(!is_keyframe(&[]));
    }
}
