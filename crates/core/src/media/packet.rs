use bytes::{BufMut, Bytes, BytesMut};

use super::descriptor::PayloadDescriptor;
use crate::error::{ParseErrorKind, Result, Vp8Error};

/// One transport fragment: descriptor, payload bytes and the transport
/// metadata (timestamp, marker) that travels outside the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub descriptor: PayloadDescriptor,
    /// Fragment bytes, without the descriptor. Usually a slice of the
    /// encoded frame buffer.
    pub payload: Bytes,
    /// 90 kHz media timestamp shared by every fragment of a frame.
    pub timestamp: u32,
    /// Set only on the last fragment of a frame.
    pub marker: bool,
}

impl Packet {
    pub fn new(
        descriptor: PayloadDescriptor,
        payload: Bytes,
        timestamp: u32,
        marker: bool,
    ) -> Self {
        Self {
            descriptor,
            payload,
            timestamp,
            marker,
        }
    }

    /// Split a transport payload into descriptor and fragment bytes.
    pub fn from_wire(mut wire: Bytes, timestamp: u32, marker: bool) -> Result<Self> {
        if wire.is_empty() {
            return Err(Vp8Error::parse(ParseErrorKind::EmptyPayload));
        }
        let descriptor = PayloadDescriptor::from_byte(wire[0]);
        let payload = wire.split_off(1);
        Ok(Self::new(descriptor, payload, timestamp, marker))
    }

    /// Transport payload: descriptor byte followed by the fragment bytes.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.payload.len());
        buf.put_u8(self.descriptor.to_byte());
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Length on the wire including the descriptor.
    pub fn wire_len(&self) -> usize {
        1 + self.payload.len()
    }
}
