use bytes::Bytes;

use super::descriptor::PayloadDescriptor;
use super::packet::Packet;
use crate::error::{Result, Vp8Error};

/// Default maximum transport payload size.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1440;

/// Default fragment size: the maximum payload minus the 1-byte descriptor.
pub const DEFAULT_FRAGMENT_SIZE: usize = DEFAULT_MAX_PAYLOAD_SIZE - 1;

/// Per-call metadata for one encoded partition (or whole frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub is_keyframe: bool,
    /// Partition index; only the low 4 bits reach the wire.
    pub partition_id: u8,
    /// 90 kHz timestamp stamped on every fragment.
    pub timestamp: u32,
    /// Whether this is the final partition of the frame. Only then does the
    /// last fragment carry the marker.
    pub last_partition: bool,
}

/// Splits encoded VP8 data into MTU-sized fragments (RFC 7741 §4.1 style,
/// 1-byte descriptor only).
///
/// A buffer of `N` bytes yields `ceil(N / mtu)` fragments in offset order,
/// each at most `mtu` payload bytes. Fragments are zero-copy slices of the
/// input buffer.
///
/// ```text
/// offset 0           mtu          2*mtu        N
///        |  S=1       |  S=0       |  S=0  M=1 |
/// ```
#[derive(Debug, Clone)]
pub struct Fragmenter {
    mtu: usize,
}

impl Fragmenter {
    pub fn new(mtu: usize) -> Result<Self> {
        if mtu == 0 {
            return Err(Vp8Error::InvalidConfig("fragment size must be non-zero"));
        }
        Ok(Self { mtu })
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn set_mtu(&mut self, mtu: usize) -> Result<()> {
        if mtu == 0 {
            return Err(Vp8Error::InvalidConfig("fragment size must be non-zero"));
        }
        self.mtu = mtu;
        Ok(())
    }

    /// Fragment one encoded buffer. Empty input yields no packets.
    pub fn fragment(&self, frame: Bytes, info: &PartitionInfo) -> Vec<Packet> {
        let mut packets = Vec::with_capacity(frame.len().div_ceil(self.mtu));
        let mut offset = 0usize;

        while offset < frame.len() {
            let remaining = frame.len() - offset;
            let chunk_size = remaining.min(self.mtu);
            let last_fragment = remaining <= self.mtu;

            let descriptor =
                PayloadDescriptor::new(info.is_keyframe, offset == 0, info.partition_id);
            let marker = info.last_partition && last_fragment;

            packets.push(Packet::new(
                descriptor,
                frame.slice(offset..offset + chunk_size),
                info.timestamp,
                marker,
            ));
            offset += chunk_size;
        }

        tracing::trace!(
            frame_bytes = frame.len(),
            fragments = packets.len(),
            partition = info.partition_id,
            keyframe = info.is_keyframe,
            ts = info.timestamp,
            "VP8 data fragmented"
        );

        packets
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_FRAGMENT_SIZE,
        }
    }
}
