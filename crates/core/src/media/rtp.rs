use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use super::packet::Packet;
use crate::error::{ParseErrorKind, Result, Vp8Error};

/// Size of the RTP fixed header.
pub const RTP_HEADER_LEN: usize = 12;

/// Dynamic payload type conventionally used for VP8.
pub const DEFAULT_PAYLOAD_TYPE: u8 = 96;

/// RTP fixed header writer (RFC 3550 §5.1) for VP8 fragments.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Unlike a codec packetizer that owns its media clock, the timestamp and
/// marker come from each [`Packet`]: the encode stream stamps fragments with
/// the processing clock and the fragmenter decides the frame boundary. This
/// struct only owns the sequence counter and the SSRC.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeader {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
}

impl RtpHeader {
    /// Create a new RTP header state with explicit SSRC.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP header state created"
        );
        Self {
            pt: pt & 0x7f,
            ssrc,
            sequence: 0,
        }
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        let ssrc = rand::rng().random::<u32>();
        Self::new(pt, ssrc)
    }

    /// Sequence number the next [`write`](Self::write) will use.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    pub fn write(&mut self, marker: bool, timestamp: u32) -> [u8; RTP_HEADER_LEN] {
        let first_byte: u8 = 2 << 6;
        let second_byte: u8 = ((marker as u8) << 7) | self.pt;

        let mut header = [0u8; RTP_HEADER_LEN];
        header[0] = first_byte;
        header[1] = second_byte;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Build a complete RTP datagram for one VP8 fragment.
    pub fn packetize(&mut self, packet: &Packet) -> Bytes {
        let hdr = self.write(packet.marker, packet.timestamp);
        let mut buf = BytesMut::with_capacity(RTP_HEADER_LEN + packet.wire_len());
        buf.extend_from_slice(&hdr);
        buf.put_u8(packet.descriptor.to_byte());
        buf.extend_from_slice(&packet.payload);
        buf.freeze()
    }
}

/// Fields of a received RTP header that the receive path cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpInfo {
    pub pt: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub marker: bool,
}

/// Parse an RTP datagram carrying a VP8 fragment.
///
/// CSRC entries and a header extension are skipped; padding is stripped.
/// The remaining payload is split into descriptor and fragment bytes.
pub fn parse_rtp(datagram: Bytes) -> Result<(RtpInfo, Packet)> {
    let short = || Vp8Error::parse(ParseErrorKind::ShortRtpHeader);

    if datagram.len() < RTP_HEADER_LEN {
        return Err(short());
    }
    let version = datagram[0] >> 6;
    if version != 2 {
        return Err(Vp8Error::parse(ParseErrorKind::UnsupportedRtpVersion(
            version,
        )));
    }
    let padding = datagram[0] & 0x20 != 0;
    let extension = datagram[0] & 0x10 != 0;
    let csrc_count = (datagram[0] & 0x0f) as usize;

    let info = RtpInfo {
        pt: datagram[1] & 0x7f,
        marker: datagram[1] & 0x80 != 0,
        sequence: u16::from_be_bytes([datagram[2], datagram[3]]),
        timestamp: u32::from_be_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]),
        ssrc: u32::from_be_bytes([datagram[8], datagram[9], datagram[10], datagram[11]]),
    };

    let mut start = RTP_HEADER_LEN + 4 * csrc_count;
    if extension {
        // 16-bit profile id, 16-bit length in 32-bit words.
        let ext = datagram.get(start..start + 4).ok_or_else(short)?;
        let words = u16::from_be_bytes([ext[2], ext[3]]) as usize;
        start += 4 + 4 * words;
    }
    let mut end = datagram.len();
    if padding {
        let pad = *datagram.last().ok_or_else(short)? as usize;
        end = end.checked_sub(pad).ok_or_else(short)?;
    }
    if start > end {
        return Err(short());
    }

    let packet = Packet::from_wire(datagram.slice(start..end), info.timestamp, info.marker)?;
    Ok((info, packet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::descriptor::PayloadDescriptor;

    fn make_header() -> RtpHeader {
        RtpHeader::new(96, 0xAABBCCDD)
    }

    fn make_packet(marker: bool) -> Packet {
        Packet::new(
            PayloadDescriptor::new(true, true, 0),
            Bytes::from_static(b"vp8"),
            0x01020304,
            marker,
        )
    }

    #[test]
    fn version_is_2() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        assert_eq!(buf[0] >> 6, 2);
    }

    #[test]
    fn marker_bit() {
        let mut h = make_header();
        let no_marker = h.write(false, 0);
        assert_eq!(no_marker[1] & 0x80, 0);

        let with_marker = h.write(true, 0);
        assert_eq!(with_marker[1] & 0x80, 0x80);
    }

    #[test]
    fn sequence_wraps() {
        let mut h = make_header();
        h.sequence = u16::MAX;
        let buf = h.write(false, 0);
        let seq = u16::from_be_bytes([buf[2], buf[3]]);
        assert_eq!(seq, u16::MAX);
        assert_eq!(h.sequence(), 0);
    }

    #[test]
    fn timestamp_comes_from_packet() {
        let mut h = make_header();
        let datagram = h.packetize(&make_packet(false));
        let ts = u32::from_be_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]);
        assert_eq!(ts, 0x01020304);
        assert_eq!(datagram[12], 0x10);
        assert_eq!(&datagram[13..], b"vp8");
    }

    #[test]
    fn parse_written_datagram() {
        let mut h = make_header();
        let datagram = h.packetize(&make_packet(true));
        let (info, packet) = parse_rtp(datagram).unwrap();
        assert_eq!(info.pt, 96);
        assert_eq!(info.ssrc, 0xAABBCCDD);
        assert_eq!(info.sequence, 0);
        assert!(info.marker);
        assert_eq!(packet, make_packet(true));
    }

    #[test]
    fn parse_skips_csrc_extension_and_padding() {
        let mut raw = vec![0x80 | 0x20 | 0x10 | 0x01, 96, 0, 5, 0, 0, 0, 9, 0, 0, 0, 1];
        raw.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]); // CSRC
        raw.extend_from_slice(&[0xbe, 0xde, 0x00, 0x01, 1, 2, 3, 4]); // extension, 1 word
        raw.extend_from_slice(&[0x30, b'x', b'y']); // descriptor + payload
        raw.extend_from_slice(&[0, 0, 3]); // padding
        let (info, packet) = parse_rtp(Bytes::from(raw)).unwrap();
        assert_eq!(info.sequence, 5);
        assert_eq!(packet.timestamp, 9);
        assert!(packet.descriptor.non_reference);
        assert!(packet.descriptor.start);
        assert_eq!(&packet.payload[..], b"xy");
    }

    #[test]
    fn parse_rejects_short_datagram() {
        let err = parse_rtp(Bytes::from_static(&[0x80, 96, 0])).unwrap_err();
        assert!(matches!(
            err,
            Vp8Error::Parse {
                kind: ParseErrorKind::ShortRtpHeader
            }
        ));
    }

    #[test]
    fn parse_rejects_wrong_version() {
        let raw = [0x40u8, 96, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10];
        let err = parse_rtp(Bytes::copy_from_slice(&raw)).unwrap_err();
        assert!(matches!(
            err,
            Vp8Error::Parse {
                kind: ParseErrorKind::UnsupportedRtpVersion(1)
            }
        ));
    }

    #[test]
    fn parse_rejects_missing_descriptor() {
        let mut h = make_header();
        let hdr = h.write(true, 0);
        assert!(parse_rtp(Bytes::copy_from_slice(&hdr)).is_err());
    }

    #[test]
    fn random_ssrc_differs() {
        let h1 = RtpHeader::with_random_ssrc(96);
        let h2 = RtpHeader::with_random_ssrc(96);
        assert_ne!(h1.ssrc, h2.ssrc);
    }
}
